pub mod admin;
pub mod hub;
pub mod parcel;
pub mod route;
pub mod zone;
