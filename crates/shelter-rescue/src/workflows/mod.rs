pub mod intake;
pub mod rescue;
