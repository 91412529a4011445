//! Message passing between workers
//!
//! [`Communicator`] is the point-to-point and collective surface the
//! orchestrator is written against. [`ThreadComm`] implements it for a world
//! of in-process workers, one OS thread per rank, wired as a star: every
//! worker holds one FIFO channel pair to the coordinator and none to the other
//! workers. Nothing is shared between workers except through these channels:
//! every vector crosses by value. With the `mpi` feature,
//! [`crate::distributed::MpiComm`] implements the same trait over MPI.

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::{Error, Result};

/// A unit of data exchanged between two ranks
#[derive(Debug, Clone, PartialEq)]
pub enum Packet<T> {
    /// Proceed/abort decision
    Flag(bool),
    /// Dimension or sequence length
    Count(usize),
    /// Row pointers or column indices
    Indices(Vec<usize>),
    /// Matrix values
    Values(Vec<T>),
    /// Outcome of a worker's local phase, with the error message on failure
    Status(std::result::Result<(), String>),
    /// Barrier token
    Barrier,
}

impl<T> Packet<T> {
    /// Short name of the packet kind, used in protocol errors
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Flag(_) => "flag",
            Packet::Count(_) => "count",
            Packet::Indices(_) => "indices",
            Packet::Values(_) => "values",
            Packet::Status(_) => "status",
            Packet::Barrier => "barrier",
        }
    }
}

/// Blocking message passing between the ranks of a fixed-size world
///
/// Messages between one pair of ranks arrive in the order they were sent.
/// Sequence helpers never transfer an empty sequence: both sides must already
/// agree on its length, and a zero length means nothing is sent.
pub trait Communicator<T: Clone> {
    /// Rank of this worker, in `0..size()`
    fn rank(&self) -> usize;

    /// Number of workers in the world
    fn size(&self) -> usize;

    /// Sends `packet` to `dest`
    fn send(&self, dest: usize, packet: Packet<T>) -> Result<()>;

    /// Blocks until the next packet from `source` arrives
    fn recv(&self, source: usize) -> Result<Packet<T>>;

    /// Blocks until every rank has entered the barrier
    fn barrier(&self) -> Result<()>;

    /// Replicates `packet` from `root` to every rank
    ///
    /// `root` passes the packet to distribute; the other ranks pass `None` and
    /// get the root's packet back.
    fn broadcast(&self, root: usize, packet: Option<Packet<T>>) -> Result<Packet<T>> {
        if self.rank() == root {
            let packet = packet.ok_or(Error::Protocol {
                rank: root,
                expected: "packet to broadcast",
                got: "nothing",
            })?;
            for dest in (0..self.size()).filter(|&dest| dest != root) {
                self.send(dest, packet.clone())?;
            }
            Ok(packet)
        } else {
            self.recv(root)
        }
    }

    /// Broadcasts a proceed/abort flag from `root`
    fn broadcast_flag(&self, root: usize, flag: bool) -> Result<bool> {
        match self.broadcast(root, Some(Packet::Flag(flag)).filter(|_| self.rank() == root))? {
            Packet::Flag(flag) => Ok(flag),
            other => Err(unexpected(self.rank(), "flag", &other)),
        }
    }

    /// Broadcasts a dimension or length from `root`
    fn broadcast_count(&self, root: usize, count: usize) -> Result<usize> {
        match self.broadcast(root, Some(Packet::Count(count)).filter(|_| self.rank() == root))? {
            Packet::Count(count) => Ok(count),
            other => Err(unexpected(self.rank(), "count", &other)),
        }
    }

    /// Broadcasts an index sequence whose length every rank already knows
    ///
    /// Receivers must have resized `buf` to the broadcast length.
    fn broadcast_indices(&self, root: usize, buf: &mut Vec<usize>) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        if self.rank() == root {
            self.broadcast(root, Some(Packet::Indices(buf.clone())))?;
            return Ok(());
        }
        match self.recv(root)? {
            Packet::Indices(data) => {
                *buf = expect_len(self.rank(), buf.len(), data)?;
                Ok(())
            }
            other => Err(unexpected(self.rank(), "indices", &other)),
        }
    }

    /// Broadcasts a value sequence whose length every rank already knows
    fn broadcast_values(&self, root: usize, buf: &mut Vec<T>) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        if self.rank() == root {
            self.broadcast(root, Some(Packet::Values(buf.clone())))?;
            return Ok(());
        }
        match self.recv(root)? {
            Packet::Values(data) => {
                *buf = expect_len(self.rank(), buf.len(), data)?;
                Ok(())
            }
            other => Err(unexpected(self.rank(), "values", &other)),
        }
    }

    /// Sends a count to `dest`
    fn send_count(&self, dest: usize, count: usize) -> Result<()> {
        self.send(dest, Packet::Count(count))
    }

    /// Receives a count from `source`
    fn recv_count(&self, source: usize) -> Result<usize> {
        match self.recv(source)? {
            Packet::Count(count) => Ok(count),
            other => Err(unexpected(self.rank(), "count", &other)),
        }
    }

    /// Sends an index sequence to `dest`, skipping the transfer if it is empty
    fn send_indices(&self, dest: usize, data: &[usize]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.send(dest, Packet::Indices(data.to_vec()))
    }

    /// Receives an index sequence of the announced length `len` from `source`
    fn recv_indices(&self, source: usize, len: usize) -> Result<Vec<usize>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        match self.recv(source)? {
            Packet::Indices(data) => expect_len(self.rank(), len, data),
            other => Err(unexpected(self.rank(), "indices", &other)),
        }
    }

    /// Sends a value sequence to `dest`, skipping the transfer if it is empty
    fn send_values(&self, dest: usize, data: &[T]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.send(dest, Packet::Values(data.to_vec()))
    }

    /// Receives a value sequence of the announced length `len` from `source`
    fn recv_values(&self, source: usize, len: usize) -> Result<Vec<T>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        match self.recv(source)? {
            Packet::Values(data) => expect_len(self.rank(), len, data),
            other => Err(unexpected(self.rank(), "values", &other)),
        }
    }
}

/// Checks that a received sequence has the length announced before it
fn expect_len<U>(rank: usize, len: usize, data: Vec<U>) -> Result<Vec<U>> {
    if data.len() != len {
        return Err(Error::Protocol {
            rank,
            expected: "sequence of the announced length",
            got: "sequence of another length",
        });
    }
    Ok(data)
}

fn unexpected<T>(rank: usize, expected: &'static str, got: &Packet<T>) -> Error {
    Error::Protocol {
        rank,
        expected,
        got: got.kind(),
    }
}

/// Channel pair between a rank and one peer
struct Link<T> {
    tx: Sender<Packet<T>>,
    rx: Receiver<Packet<T>>,
}

/// In-process endpoint of one rank
///
/// Created in sets with [`ThreadComm::world`]; each endpoint is meant to be
/// moved onto its own thread. Only rank 0 talks to every peer; the other ranks
/// can reach rank 0 alone, which is all the protocol needs, so a world of `n`
/// ranks costs `2 * (n - 1)` channels. When an endpoint is dropped, peers
/// blocked on it get [`Error::Transport`] instead of waiting forever.
pub struct ThreadComm<T> {
    rank: usize,
    size: usize,
    /// On rank 0, the link to rank `p` is at `p - 1`; elsewhere the only entry leads to rank 0
    links: Vec<Link<T>>,
}

impl<T> ThreadComm<T> {
    /// Creates connected endpoints for ranks `0..size`, in rank order
    pub fn world(size: usize) -> Vec<ThreadComm<T>> {
        if size == 0 {
            return Vec::new();
        }

        let mut hub = Vec::with_capacity(size - 1);
        let mut spokes = Vec::with_capacity(size - 1);
        for rank in 1..size {
            let (to_worker, from_hub) = channel();
            let (to_hub, from_worker) = channel();
            hub.push(Link {
                tx: to_worker,
                rx: from_worker,
            });
            spokes.push(ThreadComm {
                rank,
                size,
                links: vec![Link {
                    tx: to_hub,
                    rx: from_hub,
                }],
            });
        }

        let mut world = Vec::with_capacity(size);
        world.push(ThreadComm {
            rank: 0,
            size,
            links: hub,
        });
        world.extend(spokes);
        world
    }

    fn link(&self, peer: usize) -> Result<&Link<T>> {
        let index = match (self.rank, peer) {
            (0, 0) => None,
            (0, peer) => Some(peer - 1),
            (_, 0) => Some(0),
            _ => None,
        };
        index
            .and_then(|index| self.links.get(index))
            .ok_or(Error::Transport {
                rank: self.rank,
                peer,
            })
    }
}

impl<T: Clone> Communicator<T> for ThreadComm<T> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, packet: Packet<T>) -> Result<()> {
        self.link(dest)?.tx.send(packet).map_err(|_| Error::Transport {
            rank: self.rank,
            peer: dest,
        })
    }

    fn recv(&self, source: usize) -> Result<Packet<T>> {
        self.link(source)?.rx.recv().map_err(|_| Error::Transport {
            rank: self.rank,
            peer: source,
        })
    }

    /// Gathers a token from every rank on rank 0, then releases them all
    fn barrier(&self) -> Result<()> {
        if self.rank == 0 {
            for source in 1..self.size() {
                match self.recv(source)? {
                    Packet::Barrier => {}
                    other => return Err(unexpected(self.rank(), "barrier", &other)),
                }
            }
            for dest in 1..self.size() {
                self.send(dest, Packet::Barrier)?;
            }
            Ok(())
        } else {
            self.send(0, Packet::Barrier)?;
            match self.recv(0)? {
                Packet::Barrier => Ok(()),
                other => Err(unexpected(self.rank(), "barrier", &other)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_point_to_point_order() {
        let mut world = ThreadComm::<i64>::world(2);
        let receiver = world.pop().unwrap();
        let sender = world.pop().unwrap();

        let handle = thread::spawn(move || {
            sender.send_count(1, 3).unwrap();
            sender.send_values(1, &[1, 2, 3]).unwrap();
            sender.send_values(1, &[]).unwrap();
            sender.send_indices(1, &[9]).unwrap();
        });

        let len = receiver.recv_count(0).unwrap();
        assert_eq!(receiver.recv_values(0, len).unwrap(), vec![1, 2, 3]);
        assert!(receiver.recv_values(0, 0).unwrap().is_empty());
        assert_eq!(receiver.recv_indices(0, 1).unwrap(), vec![9]);
        handle.join().unwrap();
    }

    #[test]
    fn test_broadcast_and_barrier() {
        let world = ThreadComm::<i64>::world(4);

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = world
                .into_iter()
                .map(|comm| {
                    scope.spawn(move || {
                        let len = comm.broadcast_count(0, if comm.rank() == 0 { 2 } else { 0 })?;
                        let mut buf = if comm.rank() == 0 { vec![5, 6] } else { vec![0; len] };
                        comm.broadcast_values(0, &mut buf)?;
                        comm.barrier()?;
                        Ok::<_, Error>(buf)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for buf in results {
            assert_eq!(buf.unwrap(), vec![5, 6]);
        }
    }

    #[test]
    fn test_dropped_peer_is_transport_error() {
        let mut world = ThreadComm::<i64>::world(2);
        let survivor = world.remove(0);
        drop(world);

        assert!(matches!(
            survivor.recv(1),
            Err(Error::Transport { rank: 0, peer: 1 })
        ));
        assert!(survivor.barrier().is_err());
    }

    #[test]
    fn test_unexpected_packet_is_protocol_error() {
        let mut world = ThreadComm::<i64>::world(2);
        let receiver = world.pop().unwrap();
        let sender = world.pop().unwrap();

        sender.send(1, Packet::Flag(true)).unwrap();
        assert!(matches!(
            receiver.recv_count(0),
            Err(Error::Protocol { expected: "count", got: "flag", .. })
        ));
    }

    #[test]
    fn test_workers_only_reach_rank_zero() {
        let world = ThreadComm::<i64>::world(3);

        assert!(matches!(
            world[1].send(2, Packet::Barrier),
            Err(Error::Transport { rank: 1, peer: 2 })
        ));
        assert!(matches!(
            world[2].recv(1),
            Err(Error::Transport { rank: 2, peer: 1 })
        ));
        assert!(matches!(
            world[0].send(0, Packet::Barrier),
            Err(Error::Transport { rank: 0, peer: 0 })
        ));
        assert!(matches!(
            world[0].send(3, Packet::Barrier),
            Err(Error::Transport { rank: 0, peer: 3 })
        ));
    }

    #[test]
    fn test_large_world_is_linear() {
        let world = ThreadComm::<i64>::world(10_000);

        assert_eq!(world.len(), 10_000);
        assert_eq!(world[0].links.len(), 9_999);
        assert!(world[1..].iter().all(|comm| comm.links.len() == 1));
        assert_eq!(world[9_999].size(), 10_000);
        assert!(ThreadComm::<i64>::world(0).is_empty());
    }
}
