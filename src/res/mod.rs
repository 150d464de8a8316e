//! Resonators: the vibrating bodies that contacts and impacts excite.

pub mod modal;
pub mod modal_data;

pub use modal::ModalRes;
pub use modal_data::{Mode, ModalData};
