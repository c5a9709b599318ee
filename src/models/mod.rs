pub mod account;
pub mod reset_token;

pub use account::Account;
pub use reset_token::ResetTokenRecord;
