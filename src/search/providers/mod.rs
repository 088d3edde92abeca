mod brightdata;

pub use brightdata::BrightDataClient;
