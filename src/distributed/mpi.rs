//! MPI transport
//!
//! [`MpiComm`] runs the orchestrator across processes started by `mpirun`.
//! Point-to-point packets are tagged by kind; the receiver matches the next
//! message first and reads its tag before it allocates the buffer.
//! Broadcasts and the barrier map onto the MPI collectives.

use mpi::topology::SimpleCommunicator;
use mpi::traits::{Communicator as _, CommunicatorCollectives, Destination, Equivalence, Root, Source};
use mpi::Tag;

use crate::distributed::comm::{Communicator, Packet};
use crate::error::{Error, Result};

const FLAG: Tag = 1;
const COUNT: Tag = 2;
const INDICES: Tag = 3;
const VALUES: Tag = 4;
const STATUS_OK: Tag = 5;
const STATUS_ERR: Tag = 6;
const BARRIER: Tag = 7;

/// Tag carrying a packet of this kind
fn tag_of<T>(packet: &Packet<T>) -> Tag {
    match packet {
        Packet::Flag(_) => FLAG,
        Packet::Count(_) => COUNT,
        Packet::Indices(_) => INDICES,
        Packet::Values(_) => VALUES,
        Packet::Status(Ok(())) => STATUS_OK,
        Packet::Status(Err(_)) => STATUS_ERR,
        Packet::Barrier => BARRIER,
    }
}

/// Endpoint of one MPI process in `MPI_COMM_WORLD`
///
/// Counts and indices travel as `u64`, flags as `u8`, and status messages as
/// UTF-8 bytes.
pub struct MpiComm {
    world: SimpleCommunicator,
}

impl MpiComm {
    /// Wraps the world communicator of an initialized universe
    pub fn new(world: SimpleCommunicator) -> Self {
        Self { world }
    }

    /// Rank of this process
    pub fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    /// Number of processes in the world
    pub fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn check_peer(&self, peer: usize) -> Result<i32> {
        if peer >= self.size() || peer == self.rank() {
            return Err(Error::Transport {
                rank: self.rank(),
                peer,
            });
        }
        Ok(peer as i32)
    }

    fn protocol(&self, expected: &'static str, got: &'static str) -> Error {
        Error::Protocol {
            rank: self.rank(),
            expected,
            got,
        }
    }

    fn broadcast_words(&self, root: usize, words: &mut [u64]) {
        self.world.process_at_rank(root as i32).broadcast_into(words);
    }
}

impl<T> Communicator<T> for MpiComm
where
    T: Clone + Equivalence,
{
    fn rank(&self) -> usize {
        MpiComm::rank(self)
    }

    fn size(&self) -> usize {
        MpiComm::size(self)
    }

    fn send(&self, dest: usize, packet: Packet<T>) -> Result<()> {
        let process = self.world.process_at_rank(self.check_peer(dest)?);
        let tag = tag_of(&packet);

        match packet {
            Packet::Flag(flag) => process.send_with_tag(&[flag as u8][..], tag),
            Packet::Count(count) => process.send_with_tag(&[count as u64][..], tag),
            Packet::Indices(data) => {
                let words: Vec<u64> = data.iter().map(|&i| i as u64).collect();
                process.send_with_tag(&words[..], tag)
            }
            Packet::Values(data) => process.send_with_tag(&data[..], tag),
            Packet::Status(Err(reason)) => process.send_with_tag(reason.as_bytes(), tag),
            Packet::Status(Ok(())) | Packet::Barrier => process.send_with_tag(&[0u8][..], tag),
        }
        Ok(())
    }

    fn recv(&self, source: usize) -> Result<Packet<T>> {
        let process = self.world.process_at_rank(self.check_peer(source)?);
        let (message, status) = process.matched_probe();

        let packet = match status.tag() {
            FLAG => {
                let (data, _) = message.matched_receive_vec::<u8>();
                match data.as_slice() {
                    [flag] => Packet::Flag(*flag != 0),
                    _ => return Err(self.protocol("flag", "malformed flag")),
                }
            }
            COUNT => {
                let (data, _) = message.matched_receive_vec::<u64>();
                match data.as_slice() {
                    [count] => Packet::Count(*count as usize),
                    _ => return Err(self.protocol("count", "malformed count")),
                }
            }
            INDICES => {
                let (data, _) = message.matched_receive_vec::<u64>();
                Packet::Indices(data.into_iter().map(|i| i as usize).collect())
            }
            VALUES => {
                let (data, _) = message.matched_receive_vec::<T>();
                Packet::Values(data)
            }
            STATUS_OK => {
                message.matched_receive_vec::<u8>();
                Packet::Status(Ok(()))
            }
            STATUS_ERR => {
                let (data, _) = message.matched_receive_vec::<u8>();
                Packet::Status(Err(String::from_utf8_lossy(&data).into_owned()))
            }
            BARRIER => {
                message.matched_receive_vec::<u8>();
                Packet::Barrier
            }
            _ => {
                message.matched_receive_vec::<u8>();
                return Err(self.protocol("tagged packet", "unknown tag"));
            }
        };
        Ok(packet)
    }

    fn barrier(&self) -> Result<()> {
        self.world.barrier();
        Ok(())
    }

    fn broadcast_flag(&self, root: usize, flag: bool) -> Result<bool> {
        let mut byte = flag as u8;
        self.world.process_at_rank(root as i32).broadcast_into(&mut byte);
        Ok(byte != 0)
    }

    fn broadcast_count(&self, root: usize, count: usize) -> Result<usize> {
        let mut word = [count as u64];
        self.broadcast_words(root, &mut word);
        Ok(word[0] as usize)
    }

    fn broadcast_indices(&self, root: usize, buf: &mut Vec<usize>) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut words: Vec<u64> = buf.iter().map(|&i| i as u64).collect();
        self.broadcast_words(root, &mut words);
        *buf = words.into_iter().map(|i| i as usize).collect();
        Ok(())
    }

    fn broadcast_values(&self, root: usize, buf: &mut Vec<T>) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        self.world.process_at_rank(root as i32).broadcast_into(&mut buf[..]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_packet_kind_has_its_own_tag() {
        let packets: Vec<Packet<i64>> = vec![
            Packet::Flag(true),
            Packet::Count(3),
            Packet::Indices(vec![1]),
            Packet::Values(vec![2]),
            Packet::Status(Ok(())),
            Packet::Status(Err("overflow".to_string())),
            Packet::Barrier,
        ];

        let mut tags: Vec<Tag> = packets.iter().map(tag_of).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), packets.len());
    }
}
