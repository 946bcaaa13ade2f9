pub mod contact;
pub mod routes;
