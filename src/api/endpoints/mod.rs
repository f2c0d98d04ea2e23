pub mod flows;
pub mod health;
pub mod history;
pub mod provider;
