mod mackenzie;

pub use mackenzie::mackenzie;
