mod weak_map;

pub use weak_map::*;
