//! Flash Operation Engine (§4.3) - the chunked read/write primitive every
//! other flash-touching component is built on.

use log::debug;

use crate::constants::{address, MAX_CHUNK_WORDS};
use crate::device::{DeviceLink, Direction, LinkError};

/// One flash operation's parameters, see §4.3.
pub struct FlashOpParams<'a> {
    pub start_address: u32,
    pub length_ints: usize,
    pub chunk_ints: usize,
    pub direction: OpDirection,
    pub key: Option<u32>,
    pub data: Option<&'a [u8]>,
}

/// Mirrors `device::Direction` but only the two values this engine ever
/// issues a whole operation as - kept distinct from the per-frame
/// `Direction` so a caller can't accidentally ask for a "read" operation
/// that secretly writes a frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OpDirection {
    Read,
    Write,
}

struct Chunk {
    index: usize,
    address: u32,
    word_count: usize,
}

fn chunks_for(length_ints: usize, chunk_ints: usize) -> Vec<Chunk> {
    assert!(chunk_ints > 0 && chunk_ints <= MAX_CHUNK_WORDS);

    let full_chunks = length_ints / chunk_ints;
    let tail = length_ints % chunk_ints;
    let mut chunks = Vec::with_capacity(full_chunks + (tail > 0) as usize);

    for i in 0..full_chunks {
        chunks.push(Chunk {
            index: i,
            address: (i * chunk_ints * 4) as u32,
            word_count: chunk_ints,
        });
    }

    if tail > 0 {
        chunks.push(Chunk {
            index: full_chunks,
            address: (full_chunks * chunk_ints * 4) as u32,
            word_count: tail,
        });
    }

    chunks
}

/// Executes one chunked flash operation, returning the words read (empty
/// for writes). Chunks are issued strictly sequentially - the device's
/// flash cursor is shared state and concurrent chunks would corrupt it.
pub fn execute(link: &mut dyn DeviceLink, params: FlashOpParams) -> Result<Vec<u32>, LinkError> {
    let chunks = chunks_for(params.length_ints, params.chunk_ints);

    debug!(
        "flash op: direction={:?} start={:#010x} length_ints={} chunk_ints={} chunks={}",
        params.direction,
        params.start_address,
        params.length_ints,
        params.chunk_ints,
        chunks.len()
    );

    let mut results = Vec::with_capacity(if params.direction == OpDirection::Read {
        params.length_ints
    } else {
        0
    });

    for chunk in &chunks {
        let flash_address = params.start_address + chunk.address;

        debug!(
            "  chunk {}/{}: address={:#010x} words={}",
            chunk.index + 1,
            chunks.len(),
            flash_address,
            chunk.word_count
        );

        match params.direction {
            OpDirection::Read => {
                let addresses = [address::EXF_P_READ, address::EXF_READ];
                let directions = [Direction::Write, Direction::Read];
                let counts = [1usize, chunk.word_count];
                let mut values = vec![flash_address];
                values.extend(std::iter::repeat(0u32).take(chunk.word_count));

                let read = link.rw_many(&addresses, &directions, &counts, &values)?;
                results.extend(read);
            }
            OpDirection::Write => {
                let key = params.key.expect("write operation requires a key");
                let data = params.data.expect("write operation requires data");

                let offset = chunk.address as usize;
                let words: Vec<u32> = data[offset..offset + chunk.word_count * 4]
                    .chunks_exact(4)
                    .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
                    .collect();

                let addresses = [address::EXF_KEY, address::EXF_P_WRITE, address::EXF_WRITE];
                let directions = [Direction::Write, Direction::Write, Direction::Write];
                let counts = [1usize, 1usize, chunk.word_count];
                let mut values = vec![key, flash_address];
                values.extend(words);

                link.rw_many(&addresses, &directions, &counts, &values)?;
            }
        }
    }

    Ok(results)
}
