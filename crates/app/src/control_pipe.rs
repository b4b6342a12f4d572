//! Control-pipe reader thread.
//!
//! Reads newline-delimited commands from a named pipe (or stdin when no
//! pipe is configured) and forwards them over the channel drained by the
//! simulation's ingest phase. FIFO writers come and go, so the pipe is
//! reopened after every EOF rather than treating it as shutdown.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;

use bevy::log::{info, warn};

pub fn spawn_reader(
    path: Option<PathBuf>,
    sender: Sender<String>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("control-pipe".to_string())
        .spawn(move || match path {
            Some(path) => read_pipe(&path, sender),
            None => read_stdin(sender),
        })
}

fn read_pipe(path: &PathBuf, sender: Sender<String>) {
    info!("reading control commands from {}", path.display());
    loop {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                warn!("cannot open control pipe {}: {}", path.display(), err);
                return;
            }
        };
        for line in BufReader::new(file).lines() {
            match line {
                Ok(line) => {
                    if sender.send(line).is_err() {
                        // Receiver gone; the app is shutting down.
                        return;
                    }
                }
                Err(err) => {
                    warn!("control pipe read error: {}", err);
                    break;
                }
            }
        }
    }
}

fn read_stdin(sender: Sender<String>) {
    info!("reading control commands from stdin");
    for line in io::stdin().lines() {
        match line {
            Ok(line) => {
                if sender.send(line).is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!("stdin read error: {}", err);
                return;
            }
        }
    }
}
