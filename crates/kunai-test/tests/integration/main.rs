//! Integration tests driving the engine against a scripted transport.

mod codec;
mod discovery;
mod helpers;
mod local;
mod remote;
