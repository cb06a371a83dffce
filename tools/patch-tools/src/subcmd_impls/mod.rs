mod extract;
mod validate;

pub use extract::Extract;
pub use validate::Validate;
