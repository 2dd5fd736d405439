pub mod extractors;
pub mod validator;
