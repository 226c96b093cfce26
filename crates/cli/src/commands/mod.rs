pub(crate) mod check;
pub(crate) mod describe;
pub(crate) mod generate;
pub(crate) mod validate;
