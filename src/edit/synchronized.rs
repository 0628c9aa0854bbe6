//! Shared access to one archive from several threads.

use std::sync::{Mutex, MutexGuard};

use crate::Result;
use crate::write::{Archive, ByteSource, ZipInfo, ZipSource};

/// Acquires the archive lock, recovering from a poisoned state.
///
/// A panic in another producer leaves the archive as it was after that
/// producer's last completed operation, which is still consistent.
fn lock_or_recover<A>(mutex: &Mutex<A>) -> MutexGuard<'_, A> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Archive mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Serializes every operation on the wrapped archive behind one lock.
///
/// Each call holds the lock for its whole duration, including a long
/// [`close`](Self::close).
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::thread;
/// use zipsplice::edit::SynchronizedArchive;
/// use zipsplice::{ByteSource, ZipArchive};
///
/// let archive = Arc::new(SynchronizedArchive::new(ZipArchive::open("out.zip")?));
/// let handles: Vec<_> = (0..4)
///     .map(|i| {
///         let archive = Arc::clone(&archive);
///         thread::spawn(move || {
///             let source = ByteSource::new(vec![i as u8; 16], format!("part{}", i), 0)?;
///             archive.add(source)
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().expect("producer panicked")?;
/// }
/// archive.close()?;
/// # Ok::<(), zipsplice::Error>(())
/// ```
#[derive(Debug)]
pub struct SynchronizedArchive<A> {
    inner: Mutex<A>,
}

impl<A: Archive> SynchronizedArchive<A> {
    /// Wraps `inner`.
    pub fn new(inner: A) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Adds an entry built from bytes.
    pub fn add(&self, source: ByteSource) -> Result<()> {
        lock_or_recover(&self.inner).add(source)
    }

    /// Adds the entries selected from another archive.
    pub fn add_zip_source(&self, source: ZipSource) -> Result<()> {
        lock_or_recover(&self.inner).add_zip_source(source)
    }

    /// Removes an entry.
    pub fn delete(&self, name: &str) -> Result<()> {
        lock_or_recover(&self.inner).delete(name)
    }

    /// Closes the wrapped archive.
    pub fn close(&self) -> Result<ZipInfo> {
        lock_or_recover(&self.inner).close()
    }

    /// Returns `true` once the wrapped archive is closed.
    pub fn is_closed(&self) -> bool {
        lock_or_recover(&self.inner).is_closed()
    }

    /// Returns the wrapped archive.
    pub fn into_inner(self) -> A {
        self.inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<A: Archive> Archive for SynchronizedArchive<A> {
    fn add(&mut self, source: ByteSource) -> Result<()> {
        SynchronizedArchive::add(self, source)
    }

    fn add_zip_source(&mut self, source: ZipSource) -> Result<()> {
        SynchronizedArchive::add_zip_source(self, source)
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        SynchronizedArchive::delete(self, name)
    }

    fn close(&mut self) -> Result<ZipInfo> {
        SynchronizedArchive::close(self)
    }

    fn is_closed(&self) -> bool {
        SynchronizedArchive::is_closed(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZipArchive;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_concurrent_adds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.zip");
        let archive = Arc::new(SynchronizedArchive::new(ZipArchive::open(&path).unwrap()));

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let archive = Arc::clone(&archive);
                thread::spawn(move || {
                    for j in 0..10u8 {
                        let name = format!("t{}/e{}", i, j);
                        let source = ByteSource::new(vec![i ^ j; 64], name, 0).unwrap();
                        archive.add(source).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        archive.close().unwrap();
        assert!(archive.is_closed());

        let mut reopened = ZipArchive::open(&path).unwrap();
        assert_eq!(reopened.list_entries().len(), 80);
        assert_eq!(reopened.get_content("t3/e5").unwrap().unwrap(), vec![3 ^ 5; 64]);
    }

    #[test]
    fn test_recovers_from_poison() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(SynchronizedArchive::new(
            ZipArchive::open(dir.path().join("poison.zip")).unwrap(),
        ));
        let poisoner = Arc::clone(&archive);
        let _ = thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("producer failed");
        })
        .join();

        archive.add(ByteSource::directory("still/")).unwrap();
        let inner = Arc::try_unwrap(archive).unwrap().into_inner();
        assert_eq!(inner.list_entries(), vec!["still/"]);
    }
}
