//! Call-order independent archive output.

use super::operation::Operation;
use crate::write::{Archive, ByteSource, ZipInfo, ZipSource};
use crate::{Error, Result};

/// Buffers every operation and replays it in a canonical order on close.
///
/// Deletions are replayed first, sorted by name, then byte sources sorted by
/// name, then zip sources sorted by absolute path, each with its selection
/// sorted by destination name. Two sessions issuing the same set of
/// operations in different orders therefore produce identical files.
///
/// Errors from the wrapped archive, such as a name collision, surface from
/// [`close`](Archive::close) rather than from the call that caused them.
///
/// # Example
///
/// ```rust,no_run
/// use zipsplice::edit::OrderedArchive;
/// use zipsplice::{Archive, ByteSource, ZipArchive};
///
/// let mut archive = OrderedArchive::new(ZipArchive::open("out.zip")?);
/// archive.add(ByteSource::new(b"2".to_vec(), "b.txt", 0)?)?;
/// archive.add(ByteSource::new(b"1".to_vec(), "a.txt", 0)?)?;
/// archive.close()?; // "a.txt" is written before "b.txt"
/// # Ok::<(), zipsplice::Error>(())
/// ```
#[derive(Debug)]
pub struct OrderedArchive<A: Archive> {
    inner: A,
    pending: Vec<Operation>,
    closed: bool,
}

impl<A: Archive> OrderedArchive<A> {
    /// Wraps `inner`.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            closed: false,
        }
    }

    /// Operations buffered so far, in call order.
    pub fn pending(&self) -> &[Operation] {
        &self.pending
    }

    /// Returns the wrapped archive.
    pub fn into_inner(self) -> A {
        self.inner
    }

    fn push(&mut self, operation: Operation) -> Result<()> {
        if self.closed {
            return Err(Error::IllegalState(format!(
                "cannot {} after close",
                operation.operation_type()
            )));
        }
        self.pending.push(operation);
        Ok(())
    }

    fn sorted(&mut self) -> Vec<Operation> {
        let mut operations = std::mem::take(&mut self.pending);
        for operation in &mut operations {
            if let Operation::AddZip { source } = operation {
                source.sort_selected();
            }
        }
        operations.sort_by(|a, b| {
            a.rank().cmp(&b.rank()).then_with(|| match (a, b) {
                (Operation::Delete { name: a }, Operation::Delete { name: b }) => a.cmp(b),
                (Operation::Add { source: a }, Operation::Add { source: b }) => {
                    a.name().cmp(b.name())
                }
                (Operation::AddZip { source: a }, Operation::AddZip { source: b }) => {
                    a.sort_key().cmp(&b.sort_key())
                }
                _ => std::cmp::Ordering::Equal,
            })
        });
        operations
    }

    fn replay(&mut self, operations: Vec<Operation>) -> Result<()> {
        for operation in operations {
            match operation {
                Operation::Delete { name } => self.inner.delete(&name)?,
                Operation::Add { source } => self.inner.add(source)?,
                Operation::AddZip { source } => self.inner.add_zip_source(source)?,
            }
        }
        Ok(())
    }
}

impl<A: Archive> Archive for OrderedArchive<A> {
    fn add(&mut self, source: ByteSource) -> Result<()> {
        self.push(Operation::Add { source })
    }

    fn add_zip_source(&mut self, source: ZipSource) -> Result<()> {
        self.push(Operation::AddZip { source })
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        self.push(Operation::Delete {
            name: name.to_string(),
        })
    }

    /// Replays the buffered operations, then closes the wrapped archive even
    /// if replaying failed.
    fn close(&mut self) -> Result<ZipInfo> {
        if self.closed {
            return Err(Error::IllegalState("archive already closed".into()));
        }
        self.closed = true;
        let operations = self.sorted();
        log::debug!("Replaying {} buffered operations", operations.len());
        let replayed = self.replay(operations);
        let closed = self.inner.close();
        replayed?;
        closed
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
