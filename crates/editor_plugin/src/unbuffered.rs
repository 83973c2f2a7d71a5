//! Output handle that never holds data back from the host.
//!
//! The host reads our stdout through a pipe and reacts per line, so anything
//! sitting in a buffer is invisible to it. [`Unbuffered`] forces a flush after
//! every write. Everything else is delegated to the wrapped writer through
//! `Deref` / `DerefMut`.

use std::io;
use std::ops::{Deref, DerefMut};

use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug)]
pub struct Unbuffered<W> {
    inner: W,
}

impl<W> Unbuffered<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes all of `data`, then flushes. Errors from either step are
    /// returned unchanged.
    pub async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data).await?;
        self.inner.flush().await
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W> Deref for Unbuffered<W> {
    type Target = W;

    fn deref(&self) -> &W {
        &self.inner
    }
}

impl<W> DerefMut for Unbuffered<W> {
    fn deref_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}
