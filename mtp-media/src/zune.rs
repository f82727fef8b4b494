// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Zune metadata-artist flow: GUID'd 0xB218 artist objects and the probe
 * sequence Windows issues around them.
 *
 * Copyright (c) 2025 Code Construct
 */

//! Optional reproduction of the Zune desktop client's metadata-artist
//! behavior. The descriptor probes and the post-create read-back may be
//! telemetry only; they are reproduced as captured.

use log::debug;

use mtp::codec::Writer;
use mtp::proplist::PropertyListBuilder;
use mtp::{
    ObjectFormat, ObjectId, ObjectProperty, OperationCode, UsbTransport, Value, OBJECT_ROOT,
};

use crate::{Artist, Error, Library, Result};

/// Parses a textual GUID (`45a663b5-b1cb-4a91-bff6-2bef7bbfdd76`) into the
/// 16-byte wire form: the first three components little-endian, the final
/// eight bytes as written.
pub fn parse_guid(guid: &str) -> Option<[u8; 16]> {
    let hex: String = guid.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok();

    let mut out = [0u8; 16];
    for i in 0..4 {
        out[i] = byte(3 - i)?;
    }
    for i in 0..2 {
        out[4 + i] = byte(4 + (1 - i))?;
    }
    for i in 0..2 {
        out[6 + i] = byte(6 + (1 - i))?;
    }
    for i in 0..8 {
        out[8 + i] = byte(8 + i)?;
    }
    Some(out)
}

impl<T: UsbTransport> Library<'_, T> {
    /// Creates a metadata artist object (format `0xB218`) carrying the
    /// Zune artist GUID, reproducing the Windows client's surrounding
    /// probe traffic.
    pub fn create_artist_with_guid(&mut self, name: &str, guid: &str) -> Result<&Artist> {
        let name = crate::normalized_artist(name).to_string();
        let Some(guid) = parse_guid(guid) else {
            return Err(Error::Internal("malformed artist guid"));
        };
        if !self.artist_supported {
            // The GUID still matters for albums, so keep it locally.
            if !self.artists.contains_key(&name) {
                self.create_artist_entry(&name)?;
            }
            if let Some(artist) = self.artists.get_mut(&name) {
                artist.guid = Some(guid);
            }
            return Ok(&self.artists[&name]);
        }

        let music_folder = self.resolve_child_folder(self.music_folder, &name)?;

        let mut props = PropertyListBuilder::new();
        props
            .append(
                ObjectId(0),
                ObjectProperty::ZUNE_COLLECTION_ID,
                &Value::U8(0),
            )
            .map_err(mtp::Error::from)?;
        props
            .append(
                ObjectId(0),
                ObjectProperty::OBJECT_FILENAME,
                &Value::Str(format!("{name}.art")),
            )
            .map_err(mtp::Error::from)?;
        props
            .append(
                ObjectId(0),
                ObjectProperty::ZUNE_ARTIST_GUID,
                &Value::U128(u128::from_le_bytes(guid)),
            )
            .map_err(mtp::Error::from)?;
        props
            .append(ObjectId(0), ObjectProperty::NAME, &Value::Str(name.clone()))
            .map_err(mtp::Error::from)?;

        // The Windows client enumerates the root and probes all four
        // property descriptors before the upload.
        let _ = self
            .session
            .get_object_handles(self.storage, ObjectFormat::ANY, OBJECT_ROOT)?;
        for prop in [
            ObjectProperty::ZUNE_COLLECTION_ID,
            ObjectProperty::OBJECT_FILENAME,
            ObjectProperty::ZUNE_ARTIST_GUID,
            ObjectProperty::NAME,
        ] {
            if let Err(e) = self
                .session
                .get_object_property_desc(prop, ObjectFormat::ZUNE_METADATA_ARTIST)
            {
                debug!("descriptor probe {prop} failed: {e}");
            }
        }

        let created = self.session.send_object_prop_list(
            self.storage,
            self.artists_folder,
            ObjectFormat::ZUNE_METADATA_ARTIST,
            0,
            &props.finish(),
        )?;
        self.session.send_object(&mut std::io::empty(), 0)?;

        // Read-back of everything just written, as captured.
        if let Err(e) = self.session.get_object_property_list(
            created.object,
            ObjectFormat::ANY,
            ObjectProperty::ALL,
            0,
            0,
        ) {
            debug!("post-create property read-back failed: {e}");
        }

        self.artists.insert(
            name.clone(),
            Artist {
                id: created.object,
                music_folder,
                name: name.clone(),
                guid: Some(guid),
            },
        );
        Ok(&self.artists[&name])
    }

    /// Attaches a GUID to an already-cached artist.
    pub fn update_artist_guid(&mut self, name: &str, guid: &str) -> Result<()> {
        let Some(guid) = parse_guid(guid) else {
            return Err(Error::Internal("malformed artist guid"));
        };
        let artist = self
            .artists
            .get_mut(crate::normalized_artist(name))
            .ok_or(Error::Internal("guid update for unknown artist"))?;
        artist.guid = Some(guid);
        Ok(())
    }

    /// Registers a track name for metadata retrieval (vendor operation
    /// `0x922A`), issued after artist metadata changes.
    pub fn register_track_context(&mut self, track_name: &str) -> Result<()> {
        let mut w = Writer::new();
        w.write_string(track_name).map_err(mtp::Error::from)?;
        self.session.vendor_request(
            OperationCode::ZUNE_REGISTER_TRACK_CONTEXT,
            &[],
            Some(&w.into_vec()),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_mixed_endianness() {
        let guid = parse_guid("45a663b5-b1cb-4a91-bff6-2bef7bbfdd76").unwrap();
        assert_eq!(
            guid,
            [
                0xb5, 0x63, 0xa6, 0x45, // component 1, little-endian
                0xcb, 0xb1, // component 2
                0x91, 0x4a, // component 3
                0xbf, 0xf6, 0x2b, 0xef, 0x7b, 0xbf, 0xdd, 0x76, // tail, as written
            ]
        );
    }

    #[test]
    fn guid_rejects_malformed_input() {
        assert!(parse_guid("").is_none());
        assert!(parse_guid("45a663b5-b1cb-4a91-bff6").is_none());
        assert!(parse_guid("45a663b5-b1cb-4a91-bff6-2bef7bbfddzz").is_none());
    }
}
