//! Line commands understood by the host editor.
//!
//! The host reads our stdout line by line:
//! * a line starting with `#` is copied into the host's log,
//! * a line starting with `AddMenuItem` adds an entry to the menu bar.
//!
//! ```text
//! AddMenuItem,menu_Edit(&Edit)\editActionReIndent(Re-Indent),after#editActionUnindent,Ctrl+Alt+I
//! ^command    ^menu path \ action                           ^position               ^shortcut
//! ```
//!
//! Fields are separated by `,` and the host does no escaping. The constructors
//! refuse line breaks everywhere, `,` in every `AddMenuItem` field, and `\`,
//! `(` or `)` in menu segments, so a value can never split or shift a command.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const COMMENT_PREFIX: char = '#';
pub const ADD_MENU_ITEM: &str = "AddMenuItem";
const FIELD_SEPARATOR: char = ',';
const PATH_SEPARATOR: char = '\\';
const AFTER_PREFIX: &str = "after#";

const LINE_BREAKS: &[char] = &['\n', '\r'];
const FIELD_FORBIDDEN: &[char] = &['\n', '\r', FIELD_SEPARATOR];
const SEGMENT_FORBIDDEN: &[char] = &['\n', '\r', FIELD_SEPARATOR, PATH_SEPARATOR, '(', ')'];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty command line")]
    Empty,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("AddMenuItem needs at least a menu path and an action")]
    MissingAction,

    #[error("malformed menu segment `{0}`, expected `id(title)`")]
    MalformedSegment(String),

    #[error("malformed position `{0}`, expected `after#<action-id>`")]
    MalformedPosition(String),

    #[error("AddMenuItem takes at most 4 fields, got {0}")]
    TooManyFields(usize),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("{field} `{value}` must not contain {ch:?}")]
    ForbiddenChar { field: &'static str, value: String, ch: char },
}

fn checked(field: &'static str, value: String, forbidden: &[char]) -> Result<String, ProtocolError> {
    match value.chars().find(|c| forbidden.contains(c)) {
        Some(ch) => Err(ProtocolError::ForbiddenChar { field, value, ch }),
        None => Ok(value),
    }
}

fn checked_non_empty(field: &'static str, value: String, forbidden: &[char]) -> Result<String, ProtocolError> {
    if value.is_empty() {
        return Err(ProtocolError::EmptyField(field));
    }
    checked(field, value, forbidden)
}

// -----------------------------------------------------------------------------
// Menu items
// -----------------------------------------------------------------------------

/// One `id(title)` element of a menu path. The title may carry a `&`
/// accelerator marker, e.g. `menu_Edit(&Edit)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSegment {
    id: String,
    title: String,
}

impl MenuSegment {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: checked_non_empty("menu id", id.into(), SEGMENT_FORBIDDEN)?,
            title: checked("menu title", title.into(), SEGMENT_FORBIDDEN)?,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl fmt::Display for MenuSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.id, self.title)
    }
}

impl FromStr for MenuSegment {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ProtocolError::MalformedSegment(s.to_string());
        let body = s.strip_suffix(')').ok_or_else(malformed)?;
        let (id, title) = body.split_once('(').ok_or_else(malformed)?;
        if id.is_empty() {
            return Err(malformed());
        }
        Self::new(id, title)
    }
}

/// Where the new action goes relative to an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    After(String),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::After(id) => write!(f, "{AFTER_PREFIX}{id}"),
        }
    }
}

impl FromStr for Position {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(AFTER_PREFIX) {
            Some(id) if !id.is_empty() => {
                Ok(Position::After(checked("position action id", id.to_string(), FIELD_FORBIDDEN)?))
            }
            _ => Err(ProtocolError::MalformedPosition(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    path: Vec<MenuSegment>,
    action: MenuSegment,
    position: Option<Position>,
    shortcut: Option<String>,
}

impl MenuItem {
    /// `path` lists the menus leading to the action, outermost first.
    pub fn new(path: Vec<MenuSegment>, action: MenuSegment) -> Self {
        Self { path, action, position: None, shortcut: None }
    }

    pub fn after(mut self, action_id: impl Into<String>) -> Result<Self, ProtocolError> {
        let id = checked_non_empty("position action id", action_id.into(), FIELD_FORBIDDEN)?;
        self.position = Some(Position::After(id));
        Ok(self)
    }

    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Result<Self, ProtocolError> {
        self.shortcut = Some(checked_non_empty("shortcut", shortcut.into(), FIELD_FORBIDDEN)?);
        Ok(self)
    }

    pub fn path(&self) -> &[MenuSegment] {
        &self.path
    }

    pub fn action(&self) -> &MenuSegment {
        &self.action
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn shortcut(&self) -> Option<&str> {
        self.shortcut.as_deref()
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ADD_MENU_ITEM}{FIELD_SEPARATOR}")?;
        for segment in &self.path {
            write!(f, "{segment}{PATH_SEPARATOR}")?;
        }
        write!(f, "{}", self.action)?;

        // an empty position field keeps the shortcut in the 4th column
        if self.position.is_some() || self.shortcut.is_some() {
            write!(f, "{FIELD_SEPARATOR}")?;
            if let Some(position) = &self.position {
                write!(f, "{position}")?;
            }
        }
        if let Some(shortcut) = &self.shortcut {
            write!(f, "{FIELD_SEPARATOR}{shortcut}")?;
        }
        Ok(())
    }
}

impl FromStr for MenuItem {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(FIELD_SEPARATOR).collect();
        match fields.first() {
            Some(&ADD_MENU_ITEM) => {}
            Some(other) => return Err(ProtocolError::UnknownCommand(other.to_string())),
            None => return Err(ProtocolError::Empty),
        }
        if fields.len() > 4 {
            return Err(ProtocolError::TooManyFields(fields.len()));
        }

        let raw_path = fields.get(1).filter(|p| !p.is_empty()).ok_or(ProtocolError::MissingAction)?;
        let mut path = raw_path.split(PATH_SEPARATOR).map(MenuSegment::from_str).collect::<Result<Vec<_>, _>>()?;
        let action = path.pop().ok_or(ProtocolError::MissingAction)?;

        let position = match fields.get(2) {
            Some(p) if !p.is_empty() => Some(p.parse::<Position>()?),
            _ => None,
        };
        let shortcut = match fields.get(3) {
            Some(s) if !s.is_empty() => Some(checked("shortcut", s.to_string(), FIELD_FORBIDDEN)?),
            _ => None,
        };

        Ok(Self { path, action, position, shortcut })
    }
}

// -----------------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------------

/// Free text for the host log, stored without the `#` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment(String);

impl Comment {
    pub fn new(text: impl Into<String>) -> Result<Self, ProtocolError> {
        checked("comment", text.into(), LINE_BREAKS).map(Comment)
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Comment(Comment),
    AddMenuItem(MenuItem),
}

impl HostCommand {
    pub fn comment(text: impl Into<String>) -> Result<Self, ProtocolError> {
        Comment::new(text).map(HostCommand::Comment)
    }

    /// The command as one newline-terminated protocol line.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::Comment(comment) => write!(f, "{COMMENT_PREFIX}{}", comment.text()),
            HostCommand::AddMenuItem(item) => write!(f, "{item}"),
        }
    }
}

impl From<MenuItem> for HostCommand {
    fn from(item: MenuItem) -> Self {
        HostCommand::AddMenuItem(item)
    }
}

impl FromStr for HostCommand {
    type Err = ProtocolError;

    /// Parses a single line the way the host does. A trailing `\n` / `\r\n`
    /// is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(LINE_BREAKS);
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }
        if let Some(text) = line.strip_prefix(COMMENT_PREFIX) {
            return HostCommand::comment(text);
        }
        if line.starts_with(ADD_MENU_ITEM) {
            return line.parse().map(HostCommand::AddMenuItem);
        }
        let name = line.split(FIELD_SEPARATOR).next().unwrap_or(line);
        Err(ProtocolError::UnknownCommand(name.to_string()))
    }
}
