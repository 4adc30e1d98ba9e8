pub mod short_volume_source;
