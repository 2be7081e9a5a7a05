pub mod dictionary;
pub mod error;
pub mod persistent;
pub mod store;

pub use dictionary::Dictionary;
pub use error::StoreError;
pub use persistent::PersistentStore;
pub use store::Store;
