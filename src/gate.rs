use crate::RunError;

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds how many interpreter processes may run at once.
///
/// Admission never waits: a request that finds no free slot is turned away.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// Holds one execution slot until dropped.
#[derive(Debug)]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn try_admit(&self) -> Result<Admission, RunError> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => Ok(Admission { _permit: permit }),
            Err(_) => Err(RunError::Busy),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_when_full() {
        let gate = AdmissionGate::new(2);

        let a = gate.try_admit().unwrap();
        let b = gate.try_admit().unwrap();
        assert_eq!(gate.available(), 0);
        assert!(matches!(gate.try_admit(), Err(RunError::Busy)));

        drop(a);
        assert_eq!(gate.available(), 1);
        let _c = gate.try_admit().unwrap();

        drop(b);
        assert_eq!(gate.available(), 1);
        assert_eq!(gate.capacity(), 2);
    }

    #[test]
    fn clones_share_slots() {
        let gate = AdmissionGate::new(1);
        let other = gate.clone();

        let _held = gate.try_admit().unwrap();
        assert!(other.try_admit().is_err());
    }
}
