//! Property-based tests for the MQTT browser core

mod messages_props;
mod navigation_props;
mod topics_props;
