pub mod nav;
pub mod requests;
pub mod responses;
pub mod state;
