pub mod jwt;
pub mod numeric;
