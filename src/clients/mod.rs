pub mod energy_client;
pub mod error;
pub mod retry_client;
pub mod weather_client;
pub mod window;
