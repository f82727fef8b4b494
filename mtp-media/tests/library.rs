// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Library coordinator scenarios against a scripted session.
 *
 * Copyright (c) 2025 Code Construct
 */

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use mtp_media::{Library, LoadState, NewTrack};

use mtp::codec::Writer;
use mtp::proplist::{self, PropertyListBuilder};
use mtp::{
    ContainerType, EndpointConfig, ObjectFormat, ObjectId, ObjectProperty, Session,
    TransportError, UsbTransport, Value,
};

#[derive(Debug, Default)]
struct State {
    reads: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, Default)]
struct Scripted {
    state: Rc<RefCell<State>>,
}

impl Scripted {
    fn queue(&self, kind: ContainerType, code: u16, tid: u32, payload: &[u8]) {
        let mut out = Vec::with_capacity(12 + payload.len());
        out.extend_from_slice(&(12 + payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(kind as u16).to_le_bytes());
        out.extend_from_slice(&code.to_le_bytes());
        out.extend_from_slice(&tid.to_le_bytes());
        out.extend_from_slice(payload);
        self.state.borrow_mut().reads.push_back(out);
    }

    fn queue_data_ok(&self, code: u16, tid: u32, payload: &[u8]) {
        self.queue(ContainerType::Data, code, tid, payload);
        self.queue(ContainerType::Response, 0x2001, tid, &[]);
    }

    fn queue_ok(&self, tid: u32) {
        self.queue(ContainerType::Response, 0x2001, tid, &[]);
    }

    fn queue_ok_params(&self, tid: u32, params: &[u32]) {
        let mut payload = Vec::new();
        for p in params {
            payload.extend_from_slice(&p.to_le_bytes());
        }
        self.queue(ContainerType::Response, 0x2001, tid, &payload);
    }

    fn command_codes(&self) -> Vec<u16> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|w| w.len() >= 12 && w[4..6] == 1u16.to_le_bytes())
            .map(|w| u16::from_le_bytes([w[6], w[7]]))
            .collect()
    }

    fn data_phases(&self, code: u16) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|w| {
                w.len() >= 12
                    && w[4..6] == 2u16.to_le_bytes()
                    && w[6..8] == code.to_le_bytes()
            })
            .map(|w| w[12..].to_vec())
            .collect()
    }
}

impl UsbTransport for Scripted {
    fn write_bulk(
        &mut self,
        _endpoint: u8,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        self.state.borrow_mut().writes.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bulk(
        &mut self,
        _endpoint: u8,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        let chunk = self
            .state
            .borrow_mut()
            .reads
            .pop_front()
            .ok_or(TransportError::Timeout)?;
        assert!(chunk.len() <= buf.len());
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    fn read_interrupt(
        &mut self,
        _endpoint: u8,
        _buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        Err(TransportError::Timeout)
    }

    fn control_transfer(
        &mut self,
        _request_type: u8,
        _request: u8,
        _value: u16,
        _index: u16,
        _data: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        Ok(0)
    }

    fn clear_halt(&mut self, _endpoint: u8) -> Result<(), TransportError> {
        Ok(())
    }
}

const STORAGE: u32 = 0x0001_0001;
const ARTISTS_F: u32 = 0xf1;
const ALBUMS_F: u32 = 0xf2;
const MUSIC_F: u32 = 0xf3;

fn device_info(artist_format: bool) -> Vec<u8> {
    let mut formats = vec![0x3001u16, 0x3009, 0xba03];
    if artist_format {
        formats.push(0xba21);
    }
    let mut w = Writer::new();
    w.write_u16(100);
    w.write_u32(6);
    w.write_u16(100);
    w.write_string("microsoft.com: 1.0;").unwrap();
    w.write_u16(0);
    w.write_array_u16(&[
        0x1001, 0x1002, 0x1004, 0x1007, 0x100c, 0x100d, 0x9801, 0x9803, 0x9805, 0x9808, 0x9810,
        0x9811,
    ]);
    w.write_array_u16(&[]);
    w.write_array_u16(&[]);
    w.write_array_u16(&[]);
    w.write_array_u16(&formats);
    w.write_string("Microsoft").unwrap();
    w.write_string("Zune").unwrap();
    w.write_string("2.0").unwrap();
    w.write_string("serial").unwrap();
    w.into_vec()
}

fn string_props(entries: &[(u32, u16, &str)]) -> Vec<u8> {
    let mut b = PropertyListBuilder::new();
    for (id, prop, value) in entries {
        b.append(
            ObjectId(*id),
            ObjectProperty(*prop),
            &Value::Str((*value).to_string()),
        )
        .unwrap();
    }
    b.finish()
}

fn u32_array(values: &[u32]) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_array_u32(values);
    w.into_vec()
}

fn u16_array(values: &[u16]) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_array_u16(values);
    w.into_vec()
}

fn encoded_string(s: &str) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_string(s).unwrap();
    w.into_vec()
}

/// Scripts the construction traffic of a library with one artist "Foo"
/// (0xA1) and one album "Bar" (0xB1), all folders already present.
fn script_populated_bootstrap(script: &Scripted) {
    script.queue_data_ok(0x1001, 0, &device_info(true));
    script.queue_data_ok(0x1004, 1, &u32_array(&[STORAGE]));
    script.queue_data_ok(0x9801, 2, &u16_array(&[0xdc47, 0xdc86]));
    script.queue_data_ok(
        0x9805,
        3,
        &string_props(&[
            (ARTISTS_F, 0xdc07, "Artists"),
            (ALBUMS_F, 0xdc07, "Albums"),
            (MUSIC_F, 0xdc07, "Music"),
        ]),
    );
    // associations under Music/
    script.queue_data_ok(0x9805, 4, &string_props(&[(0xe1, 0xdc07, "Foo")]));
    // artists, then albums
    script.queue_data_ok(0x9805, 5, &string_props(&[(0xa1, 0xdc44, "Foo")]));
    script.queue_data_ok(0x9805, 6, &string_props(&[(0xb1, 0xdc44, "Bar")]));
    // per-album property reads
    script.queue_data_ok(0x9803, 7, &encoded_string("Foo"));
    script.queue_data_ok(0x9803, 8, &encoded_string("20090101T000000"));
    // album folders under the artist's music folder
    script.queue_data_ok(0x9805, 9, &string_props(&[(0xd1, 0xdc07, "Bar")]));
}

/// Scripts a device with folders but no artists or albums.
fn script_empty_bootstrap(script: &Scripted, artist_format: bool) {
    script.queue_data_ok(0x1001, 0, &device_info(artist_format));
    script.queue_data_ok(0x1004, 1, &u32_array(&[STORAGE]));
    script.queue_data_ok(0x9801, 2, &u16_array(&[0xdc47, 0xdc86]));
    let mut roots = vec![(ALBUMS_F, 0xdc07, "Albums"), (MUSIC_F, 0xdc07, "Music")];
    if artist_format {
        roots.insert(0, (ARTISTS_F, 0xdc07, "Artists"));
    }
    script.queue_data_ok(0x9805, 3, &string_props(&roots));
    script.queue_data_ok(0x9805, 4, &string_props(&[])); // Music/ is empty
    if artist_format {
        script.queue_data_ok(0x9805, 5, &string_props(&[])); // no artists
        script.queue_data_ok(0x9805, 6, &string_props(&[])); // no albums
    } else {
        script.queue_data_ok(0x9805, 5, &string_props(&[])); // no albums
    }
}

#[test]
fn bootstrap_indexes_artists_and_albums() {
    let _ = env_logger::Builder::new()
        .filter(None, log::LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let script = Scripted::default();
    script_populated_bootstrap(&script);

    let mut session = Session::new(script.clone(), EndpointConfig::default());
    let mut phases = Vec::new();
    let library = Library::new(&mut session, &mut |phase, _, _| phases.push(phase)).unwrap();

    let artist = library.artist("Foo").expect("artist indexed");
    assert_eq!(artist.id, ObjectId(0xa1));
    assert_eq!(artist.music_folder, ObjectId(0xe1));

    let album = library.album("Foo", "Bar").expect("album indexed");
    assert_eq!(album.id, ObjectId(0xb1));
    assert_eq!(album.music_folder, ObjectId(0xd1));
    assert_eq!(album.year, 2009);
    assert_eq!(album.artist, "Foo");

    assert_eq!(phases.first(), Some(&LoadState::Initialising));
    assert_eq!(phases.last(), Some(&LoadState::Loaded));
    for phase in [
        LoadState::QueryingArtists,
        LoadState::LoadingArtists,
        LoadState::QueryingAlbums,
        LoadState::LoadingAlbums,
    ] {
        assert!(phases.contains(&phase), "missing {phase:?}");
    }
}

#[test]
fn create_artist_sends_prop_list_and_empty_object() {
    let script = Scripted::default();
    script_empty_bootstrap(&script, true);
    // resolve_child_folder(Music/, "Foo"): no children
    script.queue_data_ok(0x1007, 7, &u32_array(&[]));
    // folder creation: SendObjectInfo + empty SendObject
    script.queue_ok_params(8, &[STORAGE, MUSIC_F, 0xe9]);
    script.queue_ok(9);
    // artist object: SendObjectPropList + empty SendObject
    script.queue_ok_params(10, &[STORAGE, ARTISTS_F, 0xa9]);
    script.queue_ok(11);

    let mut session = Session::new(script.clone(), EndpointConfig::default());
    let mut library = Library::new(&mut session, &mut |_, _, _| {}).unwrap();

    let artist = library.get_or_create_artist("Foo").unwrap();
    assert_eq!(artist.id, ObjectId(0xa9));
    assert_eq!(artist.music_folder, ObjectId(0xe9));

    // exactly one SendObjectPropList, decoding to {Name, ObjectFilename}
    let phases = script.data_phases(0x9808);
    assert_eq!(phases.len(), 1);
    let mut entries = Vec::new();
    proplist::parse_with(&phases[0], proplist::decode_value, |id, prop, value| {
        entries.push((id, prop, value));
    })
    .unwrap();
    assert_eq!(
        entries,
        vec![
            (ObjectId(0), ObjectProperty::NAME, Value::Str("Foo".into())),
            (
                ObjectId(0),
                ObjectProperty::OBJECT_FILENAME,
                Value::Str("Foo.art".into())
            ),
        ]
    );

    // ... followed by an empty SendObject data phase
    let codes = script.command_codes();
    let pos = codes.iter().rposition(|c| *c == 0x9808).unwrap();
    assert_eq!(codes.get(pos + 1), Some(&0x100d));
    let body = script.data_phases(0x100d);
    assert!(body.last().unwrap().is_empty());
}

#[test]
fn add_track_links_references() {
    let script = Scripted::default();
    script_populated_bootstrap(&script);
    // create_track: SendObjectPropList + SendObject
    script.queue_ok_params(10, &[STORAGE, 0xd1, 0x77]);
    script.queue_ok(11);
    // add_track: existing refs, then per-track name/index, then the write
    script.queue_data_ok(0x9810, 12, &u32_array(&[0x10]));
    script.queue_data_ok(0x9803, 13, &encoded_string("Old Song"));
    script.queue_data_ok(0x9803, 14, &1u16.to_le_bytes());
    script.queue_ok(15);

    let mut session = Session::new(script.clone(), EndpointConfig::default());
    let mut library = Library::new(&mut session, &mut |_, _, _| {}).unwrap();

    let body = vec![0x33u8; 100];
    let track = library
        .create_track(
            "Foo",
            "Bar",
            ObjectFormat::WMA,
            "Baz",
            "Alternative",
            3,
            "03 - Baz.wma",
            &mut &body[..],
            body.len() as u64,
        )
        .unwrap();
    assert_eq!(track.id, ObjectId(0x77));

    library.add_track("Foo", "Bar", &track).unwrap();
    let album = library.album("Foo", "Bar").unwrap();
    assert!(album.refs.contains(&ObjectId(0x77)));
    assert!(album.refs.contains(&ObjectId(0x10)));
    assert!(album.tracks.contains(&("Baz".to_string(), 3)));

    // the reference write carried the full set, old then new
    let refs_write = script.data_phases(0x9811);
    assert_eq!(refs_write.len(), 1);
    let expected_wire: Vec<u8> = [2u32, 0x10, 0x77]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    assert_eq!(refs_write[0], expected_wire);

    // and the device agrees with the cache through a fresh read
    let expected = album.refs.clone();
    drop(library);
    script.queue_data_ok(0x9810, 16, &u32_array(&[0x10, 0x77]));
    let device_refs = session.get_object_references(ObjectId(0xb1)).unwrap();
    assert_eq!(
        device_refs.into_iter().collect::<std::collections::BTreeSet<_>>(),
        expected
    );
}

#[test]
fn artist_falls_back_to_string_property() {
    let script = Scripted::default();
    script_empty_bootstrap(&script, false);
    // create_artist_entry: only the folder is created (no artist objects)
    script.queue_data_ok(0x1007, 6, &u32_array(&[]));
    script.queue_ok_params(7, &[STORAGE, MUSIC_F, 0xe9]);
    script.queue_ok(8);
    // album folder under the artist folder
    script.queue_data_ok(0x1007, 9, &u32_array(&[]));
    script.queue_ok_params(10, &[STORAGE, 0xe9, 0xd9]);
    script.queue_ok(11);
    // the album object itself
    script.queue_ok_params(12, &[STORAGE, ALBUMS_F, 0xb9]);

    let mut session = Session::new(script.clone(), EndpointConfig::default());
    let mut library = Library::new(&mut session, &mut |_, _, _| {}).unwrap();

    let album = library.get_or_create_album("Foo", "Bar", 2009).unwrap();
    assert_eq!(album.id, ObjectId(0xb9));

    let phases = script.data_phases(0x9808);
    assert_eq!(phases.len(), 1);
    let mut entries = Vec::new();
    proplist::parse_with(&phases[0], proplist::decode_value, |_, prop, value| {
        entries.push((prop, value));
    })
    .unwrap();
    assert_eq!(
        entries,
        vec![
            (ObjectProperty::ARTIST, Value::Str("Foo".into())),
            (ObjectProperty::NAME, Value::Str("Bar".into())),
            (
                ObjectProperty::OBJECT_FILENAME,
                Value::Str("Foo--Bar.alb".into())
            ),
            (
                ObjectProperty::DATE_AUTHORED,
                Value::Str("20090101T000000".into())
            ),
        ]
    );
    // no artist object was ever sent
    assert_eq!(phases.len(), 1);
}

#[test]
fn has_track_consults_loaded_refs() {
    let script = Scripted::default();
    script_populated_bootstrap(&script);
    script.queue_data_ok(0x9810, 10, &u32_array(&[0x10]));
    script.queue_data_ok(0x9803, 11, &encoded_string("Old Song"));
    script.queue_data_ok(0x9803, 12, &1u16.to_le_bytes());

    let mut session = Session::new(script.clone(), EndpointConfig::default());
    let mut library = Library::new(&mut session, &mut |_, _, _| {}).unwrap();

    assert!(library.has_track("Foo", "Bar", "Old Song", 1).unwrap());
    assert!(!library.has_track("Foo", "Bar", "Old Song", 2).unwrap());
    assert!(!library.has_track("Foo", "Missing", "x", 1).unwrap());

    let track = NewTrack {
        id: ObjectId(0x88),
        name: "New".into(),
        index: 2,
    };
    script.queue_ok(13); // SetObjectReferences only; refs already loaded
    library.add_track("Foo", "Bar", &track).unwrap();
    assert!(library.has_track("Foo", "Bar", "New", 2).unwrap());
}
