pub mod finra_client;
