pub mod bot;
pub mod config;
pub mod detect;
pub mod extract;
pub mod fetch;
pub mod notify;
pub mod parser;
pub mod state;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
