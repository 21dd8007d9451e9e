//! Resolves Deezer tracks, albums and playlists to their best available
//! stream and writes the audio to a sink.
//!
//! A run takes a [`fanout::Downloadable`] through three stages per track:
//!
//! 1. [`builder::Builder`] fetches the track's metadata and classifies
//!    tracks that cannot be delivered at all
//! 2. [`negotiate::Negotiator`] settles on a bitrate, degrading along a
//!    fixed ladder if allowed
//! 3. [`pipeline::Pipeline`] streams, and if configured decrypts, the
//!    audio into the sink
//!
//! [`download::Downloader`] drives the stages and reports a classified
//! [`failure::FailureKind`] for every track that was not delivered.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

#[macro_use]
extern crate log;

pub mod api;
pub mod arl;
pub mod builder;
pub mod config;
pub mod container;
pub mod credentials;
pub mod decrypt;
pub mod deezer;
pub mod download;
pub mod error;
pub mod events;
pub mod failure;
pub mod fanout;
pub mod format;
pub mod gateway;
pub mod generate;
pub mod http;
pub mod link;
pub mod negotiate;
pub mod pipeline;
pub mod protocol;
pub mod service;
pub mod signal;
pub mod track;
pub mod uuid;
