// TalkTagger game client

pub mod client;
pub mod core;
