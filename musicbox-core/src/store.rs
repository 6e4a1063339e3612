//! Non-volatile byte store.
//!
//! The node only needs single-byte reads and writes at small addresses.
//! [`StorageStore`] provides that on top of any [`embedded_storage::Storage`],
//! e.g. a reserved flash page wrapped in
//! [`RmwNorFlashStorage`](embedded_storage::nor_flash::RmwNorFlashStorage).

use embedded_storage::Storage;

/// Address of the persisted node ID.
pub const NODE_ID_ADDRESS: u8 = 0;

/// Single-byte addressed persistent storage.
pub trait NodeStore {
    type Error;

    fn read(&mut self, address: u8) -> Result<u8, Self::Error>;

    fn write(&mut self, address: u8, value: u8) -> Result<(), Self::Error>;
}

impl<T: NodeStore + ?Sized> NodeStore for &mut T {
    type Error = T::Error;

    fn read(&mut self, address: u8) -> Result<u8, Self::Error> {
        T::read(&mut **self, address)
    }

    fn write(&mut self, address: u8, value: u8) -> Result<(), Self::Error> {
        T::write(&mut **self, address, value)
    }
}

/// [`NodeStore`] over a byte-addressable [`Storage`] region starting at
/// `base`.
pub struct StorageStore<S> {
    storage: S,
    base: u32,
}

impl<S: Storage> StorageStore<S> {
    pub fn new(storage: S, base: u32) -> Self {
        Self { storage, base }
    }

    fn offset(&self, address: u8) -> u32 {
        self.base + u32::from(address)
    }
}

impl<S: Storage> NodeStore for StorageStore<S> {
    type Error = S::Error;

    fn read(&mut self, address: u8) -> Result<u8, Self::Error> {
        let mut byte = [0u8; 1];
        let offset = self.offset(address);
        self.storage.read(offset, &mut byte)?;
        Ok(byte[0])
    }

    fn write(&mut self, address: u8, value: u8) -> Result<(), Self::Error> {
        let offset = self.offset(address);
        self.storage.write(offset, &[value])
    }
}
