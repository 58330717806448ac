//! Legacy CPU profile decoder.
//!
//! Reads the preamble, the self-describing header and then the sample
//! records, folding them into distinct stacks in a single pass.

use super::framer::{WordRead, WordReader};
use super::schema::{Profile, ProfileHeader};
use crate::aggregator::StackAggregator;
use crate::utils::config::{CORRUPT_PROFILE, PROFILE_VERSION};
use crate::utils::error::ProfileError;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

/// Decode a legacy CPU profile from a byte stream
///
/// **Public** - main entry point for decoding
///
/// # Returns
/// The aggregated profile. A stream that ends cleanly where the next record
/// would start is not an error: the records read so far are returned and
/// `Profile::incomplete` is set.
///
/// # Errors
/// * `ProfileError::Format` - bad magic, bad version, header too short, or a
///   record cut off after its sample count
/// * `ProfileError::Io` - the reader failed
pub fn decode<R: Read>(reader: R) -> Result<Profile, ProfileError> {
    let (mut words, header_words) = WordReader::detect(reader)?;
    let layout = words.layout();

    let header = read_header(&mut words, header_words)?;
    debug!(
        "Profile header: version {}, period {:?}, {} extra words",
        header.version,
        header.period,
        header.extra.len()
    );

    let mut aggregator = StackAggregator::new();
    let mut incomplete = false;
    let mut records = 0u64;

    loop {
        let count = match words.next_word()? {
            WordRead::Word(n) => n,
            WordRead::End => {
                warn!("Warning: incomplete cpu profile");
                incomplete = true;
                break;
            }
        };
        let depth = words.read_word("stack depth")?;
        let pcs = words.read_words(depth, "stack")?;

        if count == 0 && depth == 1 && pcs[0] == 0 {
            debug!("Stop sentinel after {} records", records);
            break;
        }

        records += 1;
        if pcs.is_empty() {
            debug!("Skipping empty stack record ({} samples)", count);
            continue;
        }
        aggregator.add(pcs, count);
    }

    let (stacks, total_samples) = aggregator.finish();

    info!(
        "Decoded {} records into {} distinct stacks ({} samples)",
        records,
        stacks.len(),
        total_samples
    );

    Ok(Profile {
        header,
        stacks,
        total_samples,
        incomplete,
        layout,
    })
}

/// Decode a legacy CPU profile from a file on disk
pub fn decode_file(path: impl AsRef<Path>) -> Result<Profile, ProfileError> {
    let path = path.as_ref();
    debug!("Reading profile from: {}", path.display());

    let file = File::open(path)?;
    decode(BufReader::new(file))
}

/// Read the fixed-size header block
///
/// **Private** - internal helper for decode
fn read_header<R: Read>(
    words: &mut WordReader<R>,
    header_words: u64,
) -> Result<ProfileHeader, ProfileError> {
    let block = words.read_words(header_words, "header").map_err(|e| match e {
        ProfileError::Format(_) => ProfileError::format("truncated profile header"),
        other => other,
    })?;

    let version = block[0];
    if version != PROFILE_VERSION {
        return Err(ProfileError::format(CORRUPT_PROFILE));
    }

    Ok(ProfileHeader {
        version,
        period: Duration::from_micros(block[1]),
        extra: block[2..].to_vec(),
    })
}
