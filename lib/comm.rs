//! Point-to-point messaging and reductions between ranks.
//!
//! Each rank owns one [`Communicator`]. Messages are vectors of `f64` matched by
//! source rank and tag; messages with the same source and tag are received in
//! the order they were sent. Sends never block, so a rank may always send
//! before it receives.

use std::{
    cell::RefCell,
    collections::VecDeque,
    sync::mpsc,
    thread,
    time::Duration,
};
use log::{ debug, error };
use crate::error::CommError;

/// Tag reserved for [`Communicator::all_reduce_sum`].
pub const TAG_REDUCE: u32 = 0xffff_0000;

/// Messaging layer connecting the ranks of a process grid.
pub trait Communicator {
    /// Index of this rank.
    fn rank(&self) -> usize;

    /// Total number of ranks.
    fn size(&self) -> usize;

    /// Queue `data` for delivery to `dest`.
    fn send(&self, dest: usize, tag: u32, data: Vec<f64>) -> Result<(), CommError>;

    /// Block until a message with `tag` arrives from `source`.
    fn recv(&self, source: usize, tag: u32) -> Result<Vec<f64>, CommError>;

    /// Send to `dest` (if any), then receive from `source` (if any).
    fn sendrecv(
        &self,
        dest: Option<usize>,
        data: Vec<f64>,
        source: Option<usize>,
        tag: u32,
    ) -> Result<Option<Vec<f64>>, CommError>
    {
        if let Some(dest) = dest { self.send(dest, tag, data)?; }
        source.map(|source| self.recv(source, tag)).transpose()
    }

    /// Element-wise sum of `values` over all ranks.
    ///
    /// Contributions are added in rank order, so every rank gets bitwise the
    /// same result.
    fn all_reduce_sum(&self, values: &[f64]) -> Result<Vec<f64>, CommError> {
        let (rank, size) = (self.rank(), self.size());
        for dest in (0..size).filter(|&r| r != rank) {
            self.send(dest, TAG_REDUCE, values.to_vec())?;
        }
        let mut acc = vec![0.0; values.len()];
        for source in 0..size {
            let part
                = if source == rank {
                    values.to_vec()
                } else {
                    self.recv(source, TAG_REDUCE)?
                };
            if part.len() != values.len() {
                return Err(CommError::SizeMismatch {
                    source_rank: source,
                    expected: values.len(),
                    got: part.len(),
                });
            }
            acc.iter_mut().zip(part).for_each(|(a, p)| { *a += p; });
        }
        Ok(acc)
    }
}

/// Communicator for a world of one rank.
///
/// Messages sent to rank 0 are delivered back to itself, which is how periodic
/// halos wrap around on a single rank.
#[derive(Debug, Default)]
pub struct SingleRank {
    queue: RefCell<VecDeque<(u32, Vec<f64>)>>,
}

impl SingleRank {
    pub fn new() -> Self { Self::default() }
}

impl Communicator for SingleRank {
    fn rank(&self) -> usize { 0 }

    fn size(&self) -> usize { 1 }

    fn send(&self, dest: usize, tag: u32, data: Vec<f64>) -> Result<(), CommError> {
        if dest != 0 { return Err(CommError::Disconnected(dest)); }
        self.queue.borrow_mut().push_back((tag, data));
        Ok(())
    }

    fn recv(&self, source: usize, tag: u32) -> Result<Vec<f64>, CommError> {
        if source != 0 { return Err(CommError::Disconnected(source)); }
        let mut queue = self.queue.borrow_mut();
        let k = queue.iter()
            .position(|(t, _)| *t == tag)
            .ok_or(CommError::Timeout(source, tag))?;
        queue.remove(k)
            .map(|(_, data)| data)
            .ok_or(CommError::Timeout(source, tag))
    }

    fn all_reduce_sum(&self, values: &[f64]) -> Result<Vec<f64>, CommError> {
        Ok(values.to_vec())
    }
}

#[derive(Debug)]
struct Envelope {
    source: usize,
    tag: u32,
    data: Vec<f64>,
}

/// Receive timeout used by [`ThreadComm::run`].
pub const DEF_TIMEOUT: Duration = Duration::from_secs(60);

/// Communicator for ranks running as threads of one process, connected by
/// channels.
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    // one per rank; `None` at our own index
    peers: Vec<Option<mpsc::Sender<Envelope>>>,
    inbox: mpsc::Receiver<Envelope>,
    // arrived but not yet asked for
    stash: RefCell<VecDeque<Envelope>>,
    timeout: Duration,
}

impl ThreadComm {
    /// Create the communicators of a `procs`-rank world, in rank order.
    pub fn world(procs: usize, timeout: Duration) -> Vec<Self> {
        let (senders, inboxes): (Vec<_>, Vec<_>)
            = (0..procs).map(|_| mpsc::channel::<Envelope>()).unzip();
        inboxes.into_iter()
            .enumerate()
            .map(|(rank, inbox)| {
                let peers: Vec<Option<mpsc::Sender<Envelope>>>
                    = senders.iter()
                    .enumerate()
                    .map(|(r, tx)| (r != rank).then(|| tx.clone()))
                    .collect();
                Self {
                    rank,
                    peers,
                    inbox,
                    stash: RefCell::new(VecDeque::new()),
                    timeout,
                }
            })
            .collect()
    }

    /// Run `f` on `procs` ranks, one scoped thread each, and collect the
    /// results in rank order.
    pub fn run<F, T>(procs: usize, f: F) -> Result<Vec<T>, CommError>
    where
        F: Fn(ThreadComm) -> T + Sync,
        T: Send,
    {
        Self::run_with_timeout(procs, DEF_TIMEOUT, f)
    }

    /// Like [`Self::run`], with a custom receive timeout.
    pub fn run_with_timeout<F, T>(procs: usize, timeout: Duration, f: F)
        -> Result<Vec<T>, CommError>
    where
        F: Fn(ThreadComm) -> T + Sync,
        T: Send,
    {
        debug!("spawning {} rank threads", procs);
        let comms = Self::world(procs, timeout);
        let f = &f;
        thread::scope(|s| {
            let handles: Vec<_>
                = comms.into_iter()
                .map(|comm| s.spawn(move || f(comm)))
                .collect();
            handles.into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle.join().map_err(|_| {
                        error!("rank {} panicked", rank);
                        CommError::Panicked(rank)
                    })
                })
                .collect()
        })
    }

    fn take_stashed(&self, source: usize, tag: u32) -> Option<Vec<f64>> {
        let mut stash = self.stash.borrow_mut();
        let k = stash.iter()
            .position(|env| env.source == source && env.tag == tag)?;
        stash.remove(k).map(|env| env.data)
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize { self.rank }

    fn size(&self) -> usize { self.peers.len() }

    fn send(&self, dest: usize, tag: u32, data: Vec<f64>) -> Result<(), CommError> {
        let env = Envelope { source: self.rank, tag, data };
        if dest == self.rank {
            self.stash.borrow_mut().push_back(env);
            return Ok(());
        }
        self.peers.get(dest)
            .and_then(|tx| tx.as_ref())
            .ok_or(CommError::Disconnected(dest))?
            .send(env)
            .map_err(|_| CommError::Disconnected(dest))
    }

    fn recv(&self, source: usize, tag: u32) -> Result<Vec<f64>, CommError> {
        if let Some(data) = self.take_stashed(source, tag) {
            return Ok(data);
        }
        loop {
            let env
                = self.inbox.recv_timeout(self.timeout)
                .map_err(|e| match e {
                    mpsc::RecvTimeoutError::Timeout
                        => CommError::Timeout(source, tag),
                    mpsc::RecvTimeoutError::Disconnected
                        => CommError::Disconnected(source),
                })?;
            if env.source == source && env.tag == tag {
                return Ok(env.data);
            }
            self.stash.borrow_mut().push_back(env);
        }
    }
}
