use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{DType, Error, Result};

/// Flat typed buffer shared by every view created from it.
///
/// Cloning a storage creates another handle to the same buffer. The length is
/// fixed at creation.
pub struct Storage<T: DType> {
    data: Arc<RwLock<Vec<T>>>,
    len: usize,
}

impl<T: DType> Clone for Storage<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            len: self.len,
        }
    }
}

impl<T: DType> std::fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("dtype", &T::ELEM)
            .field("len", &self.len)
            .field("bytes", &(self.len * T::ELEM.size_of()))
            .finish()
    }
}

impl<T: DType> Storage<T> {
    pub fn from_vec(data: Vec<T>) -> Self {
        let len = data.len();
        Self {
            data: Arc::new(RwLock::new(data)),
            len,
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self::full(len, T::ZERO)
    }

    pub fn full(len: usize, value: T) -> Self {
        Self::from_vec(vec![value; len])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, ptr: usize) -> Result<T> {
        self.read()
            .get(ptr)
            .copied()
            .ok_or_else(|| Error::out_of_bounds("storage get", self.bounds_msg(ptr)))
    }

    pub fn set(&self, ptr: usize, value: T) -> Result<()> {
        let mut data = self.write();
        match data.get_mut(ptr) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::out_of_bounds("storage set", self.bounds_msg(ptr))),
        }
    }

    fn bounds_msg(&self, ptr: usize) -> String {
        format!("pointer {ptr} for storage of length {}", self.len)
    }

    // The buffer holds plain numbers, a poisoned lock leaves nothing inconsistent.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    /// True if both handles share one buffer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Identity of the shared buffer, stable for its lifetime.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.data) as *const () as usize
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.read().clone()
    }
}
