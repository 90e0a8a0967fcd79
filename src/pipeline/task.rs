//! Background execution and the messages workers post back to the UI loop.

use std::sync::mpsc::Sender;
use std::thread;

use image::DynamicImage;
use tracing::{debug, error};

use crate::api::{MemberRef, StatRow};

use super::generation::Epoch;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs fetch jobs off the UI thread
pub trait Spawn {
    fn spawn(&self, name: &str, job: Job);
}

/// One detached, named OS thread per job
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl Spawn for ThreadSpawner {
    fn spawn(&self, name: &str, job: Job) {
        let result = thread::Builder::new()
            .name(format!("dexview-{name}"))
            .spawn(job);
        if let Err(err) = result {
            error!(task = name, error = %err, "failed to spawn worker thread");
        }
    }
}

/// Results posted from workers. Each carries the epoch it was requested under.
#[derive(Debug)]
pub enum Update {
    Members {
        epoch: Epoch,
        group: String,
        members: Vec<MemberRef>,
    },
    MembersFailed {
        epoch: Epoch,
        group: String,
        error: String,
    },
    MembersDone {
        epoch: Epoch,
    },
    Detail {
        epoch: Epoch,
        member: MemberRef,
        rows: Vec<StatRow>,
    },
    DetailFailed {
        epoch: Epoch,
        member: MemberRef,
        error: String,
    },
    Sprite {
        epoch: Epoch,
        image: DynamicImage,
    },
    SpriteFailed {
        epoch: Epoch,
        error: String,
    },
}

/// Sending half handed to workers
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: Sender<Update>,
}

impl Outbox {
    pub fn new(tx: Sender<Update>) -> Self {
        Self { tx }
    }

    pub fn post(&self, update: Update) {
        // The receiver only goes away when the UI is shutting down
        if self.tx.send(update).is_err() {
            debug!("UI loop gone, dropping update");
        }
    }
}
