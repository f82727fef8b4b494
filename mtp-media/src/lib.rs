// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Media library coordinator: keeps the device-side artist/album graph
 * consistent with local intent.
 *
 * Copyright (c) 2025 Code Construct
 */

#![forbid(unsafe_code)]

//! # MTP media library
//!
//! [`Library`] maintains an in-memory index of the device's artists and
//! albums, resolves the `Artists/`, `Albums/` and `Music/` folders
//! (creating what is missing), and writes new artists, albums, tracks and
//! cover art through property lists and object references.
//!
//! Albums refer to artists by name key into the library's artist map, not
//! by ownership; the `(artist, album name)` pair is an album's identity.
//!
//! Devices without an artist object format fall back to carrying the
//! artist as a string property on albums and tracks.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;

use log::{debug, warn};
use thiserror::Error;

use mtp::message::DeviceInfo;
use mtp::proplist::{self, PropertyListBuilder};
use mtp::{
    ObjectFormat, ObjectId, ObjectProperty, OperationCode, Session, StorageId, UsbTransport,
    Value, OBJECT_ROOT,
};

#[cfg(feature = "zune-metadata")]
mod zune;

/// Stand-in name for artists the device reports without one.
///
/// The historical spelling is kept: devices in the field have folders
/// created under it.
pub const UNKNOWN_ARTIST: &str = "UknownArtist";
/// Stand-in name for unnamed albums.
pub const UNKNOWN_ALBUM: &str = "UknownAlbum";

const ARTISTS_FOLDER: &str = "Artists";
const ALBUMS_FOLDER: &str = "Albums";
const MUSIC_FOLDER: &str = "Music";

/// Library failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The device reports no storage; it may be locked.
    #[error("no storages found")]
    NoStorage,
    /// The device lacks the property-list or reference operations the
    /// library needs.
    #[error("device does not support the media library operations")]
    Unsupported,
    /// An internal invariant broke.
    #[error("internal error: {0}")]
    Internal(&'static str),
    /// Failure of an underlying MTP operation.
    #[error(transparent)]
    Mtp(#[from] mtp::Error),
}

/// Library result type.
pub type Result<T> = core::result::Result<T, Error>;

/// Phases reported while the library loads.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum LoadState {
    /// Capability discovery and folder resolution.
    Initialising,
    /// Fetching the artist list.
    QueryingArtists,
    /// Indexing artists.
    LoadingArtists,
    /// Fetching the album list.
    QueryingAlbums,
    /// Indexing albums.
    LoadingAlbums,
    /// Done.
    Loaded,
}

/// Progress callback: `(phase, done, total)`.
pub type ProgressFn<'a> = &'a mut dyn FnMut(LoadState, u64, u64);

/// A device-side artist.
#[derive(Clone, Debug)]
pub struct Artist {
    /// Artist object handle; zero on devices without artist objects.
    pub id: ObjectId,
    /// The artist's folder under `Music/`.
    pub music_folder: ObjectId,
    /// Artist name, the map key.
    pub name: String,
    /// Zune artist GUID, when present.
    pub guid: Option<[u8; 16]>,
}

/// A device-side album.
#[derive(Clone, Debug)]
pub struct Album {
    /// Album object handle.
    pub id: ObjectId,
    /// The album's folder under the artist's music folder.
    pub music_folder: ObjectId,
    /// Name key of the owning artist.
    pub artist: String,
    /// Album name.
    pub name: String,
    /// Release year; zero when unknown.
    pub year: u16,
    /// Track references, as last synchronised with the device.
    pub refs: BTreeSet<ObjectId>,
    /// `(track name, track index)` pairs of the referenced tracks.
    pub tracks: Vec<(String, u32)>,
    refs_loaded: bool,
}

/// Identity of a freshly created track.
#[derive(Clone, Debug)]
pub struct NewTrack {
    /// Object handle of the track.
    pub id: ObjectId,
    /// Track name.
    pub name: String,
    /// Track index inside the album; zero when not set.
    pub index: u32,
}

type AlbumKey = (String, String);

/// The media library coordinator. Lives no longer than its session.
pub struct Library<'s, T: UsbTransport> {
    session: &'s mut Session<T>,
    storage: StorageId,
    artists_folder: ObjectId,
    albums_folder: ObjectId,
    music_folder: ObjectId,
    artist_supported: bool,
    album_date_authored_supported: bool,
    album_cover_supported: bool,
    artists: HashMap<String, Artist>,
    albums: HashMap<AlbumKey, Album>,
}

impl<'s, T: UsbTransport> Library<'s, T> {
    /// Whether the device carries what the library needs: property lists,
    /// property-list uploads, reference writes and abstract audio albums.
    pub fn supported(info: &DeviceInfo) -> bool {
        info.supports_operation(OperationCode::GET_OBJECT_PROP_LIST)
            && info.supports_operation(OperationCode::SEND_OBJECT_PROP_LIST)
            && info.supports_operation(OperationCode::SET_OBJECT_REFERENCES)
            && info.supports_format(ObjectFormat::ABSTRACT_AUDIO_ALBUM)
    }

    /// Builds the library index from the device, reporting progress
    /// through `progress`.
    pub fn new(session: &'s mut Session<T>, progress: ProgressFn<'_>) -> Result<Self> {
        let info = session.get_device_info()?;
        if !Self::supported(info) {
            return Err(Error::Unsupported);
        }
        let artist_supported = info.supports_format(ObjectFormat::ARTIST);
        debug!("device supports artist objects: {artist_supported}");

        let mut progress_done = 0u64;
        let mut progress_total = 0u64;
        progress(LoadState::Initialising, progress_done, progress_total);

        let storages = session.get_storage_ids()?;
        // Zune refuses to create artists or albums without a storage id,
        // so the first storage is picked up front.
        let storage = *storages.ids.first().ok_or(Error::NoStorage)?;

        let album_props = session.get_object_properties_supported(ObjectFormat::ABSTRACT_AUDIO_ALBUM)?;
        let album_date_authored_supported = album_props.supports(ObjectProperty::DATE_AUTHORED);
        let album_cover_supported = album_props.supports(ObjectProperty::REPRESENTATIVE_SAMPLE_DATA);
        debug!(
            "album supports date authored: {album_date_authored_supported}, cover: {album_cover_supported}"
        );

        let mut lib = Self {
            session,
            storage,
            artists_folder: ObjectId(0),
            albums_folder: ObjectId(0),
            music_folder: ObjectId(0),
            artist_supported,
            album_date_authored_supported,
            album_cover_supported,
            artists: HashMap::new(),
            albums: HashMap::new(),
        };

        let roots = lib.list_associations(OBJECT_ROOT)?;
        lib.artists_folder = roots.get(ARTISTS_FOLDER).copied().unwrap_or(ObjectId(0));
        lib.albums_folder = roots.get(ALBUMS_FOLDER).copied().unwrap_or(ObjectId(0));
        lib.music_folder = roots.get(MUSIC_FOLDER).copied().unwrap_or(ObjectId(0));

        if lib.artist_supported && lib.artists_folder == ObjectId(0) {
            lib.artists_folder = lib.create_folder(ARTISTS_FOLDER, OBJECT_ROOT)?;
        }
        if lib.albums_folder == ObjectId(0) {
            lib.albums_folder = lib.create_folder(ALBUMS_FOLDER, OBJECT_ROOT)?;
        }
        if lib.music_folder == ObjectId(0) {
            lib.music_folder = lib.create_folder(MUSIC_FOLDER, OBJECT_ROOT)?;
        }
        debug!(
            "folders: artists {}, albums {}, music {}",
            lib.artists_folder, lib.albums_folder, lib.music_folder
        );

        let music_folders = lib.list_associations(lib.music_folder)?;

        let artists_data = if lib.artist_supported {
            progress(LoadState::QueryingArtists, progress_done, progress_total);
            let data = lib.session.get_object_property_list(
                OBJECT_ROOT,
                ObjectFormat::ARTIST,
                ObjectProperty::NAME,
                0,
                1,
            )?;
            progress_total += proplist::entry_count(&data).map_err(mtp::Error::from)? as u64;
            Some(data)
        } else {
            None
        };

        progress(LoadState::QueryingAlbums, progress_done, progress_total);
        let albums_data = lib.session.get_object_property_list(
            OBJECT_ROOT,
            ObjectFormat::ABSTRACT_AUDIO_ALBUM,
            ObjectProperty::NAME,
            0,
            1,
        )?;
        progress_total += proplist::entry_count(&albums_data).map_err(mtp::Error::from)? as u64;

        if let Some(data) = artists_data {
            progress(LoadState::LoadingArtists, progress_done, progress_total);
            let mut found = Vec::new();
            proplist::parse_with(&data, proplist::decode_string, |id, _, name| {
                if let Some(name) = name {
                    found.push((id, name));
                }
            })
            .map_err(mtp::Error::from)?;

            for (id, name) in found {
                debug!("artist: {name}\t{id}");
                let music_folder = match music_folders.get(&name) {
                    Some(id) => *id,
                    None => lib.create_folder(&name, lib.music_folder)?,
                };
                let guid = lib.fetch_artist_guid(id);
                lib.artists.insert(
                    name.clone(),
                    Artist {
                        id,
                        music_folder,
                        name,
                        guid,
                    },
                );
                progress_done += 1;
                progress(LoadState::LoadingArtists, progress_done, progress_total);
            }
        }

        progress(LoadState::LoadingAlbums, progress_done, progress_total);
        let mut found = Vec::new();
        proplist::parse_with(&albums_data, proplist::decode_string, |id, _, name| {
            if let Some(name) = name {
                found.push((id, name));
            }
        })
        .map_err(mtp::Error::from)?;

        let mut album_folders: HashMap<String, HashMap<String, ObjectId>> = HashMap::new();
        for (id, name) in found {
            let artist_name = lib
                .session
                .get_object_string_property(id, ObjectProperty::ARTIST)?;
            let date = if lib.album_date_authored_supported {
                lib.session
                    .get_object_string_property(id, ObjectProperty::DATE_AUTHORED)?
            } else {
                String::new()
            };

            if !lib.artists.contains_key(normalized_artist(&artist_name)) {
                lib.create_artist_entry(&artist_name)?;
            }
            let artist_key = normalized_artist(&artist_name).to_string();
            debug!("album: {artist_key} -- {name}\t{id}\t{date}");

            if !album_folders.contains_key(&artist_key) {
                let folder = lib
                    .artists
                    .get(&artist_key)
                    .ok_or(Error::Internal("artist missing after insert"))?
                    .music_folder;
                let assoc = lib.list_associations(folder)?;
                album_folders.insert(artist_key.clone(), assoc);
            }
            let folders = album_folders
                .get(&artist_key)
                .ok_or(Error::Internal("no iterator after insert"))?;

            let music_folder = match folders.get(&name) {
                Some(id) => *id,
                None => {
                    let parent = lib
                        .artists
                        .get(&artist_key)
                        .ok_or(Error::Internal("artist missing after insert"))?
                        .music_folder;
                    lib.create_folder(&name, parent)?
                }
            };

            lib.albums.insert(
                (artist_key.clone(), name.clone()),
                Album {
                    id,
                    music_folder,
                    artist: artist_key,
                    name,
                    year: parse_year(&date),
                    refs: BTreeSet::new(),
                    tracks: Vec::new(),
                    refs_loaded: false,
                },
            );
            progress_done += 1;
            progress(LoadState::LoadingAlbums, progress_done, progress_total);
        }

        progress(LoadState::Loaded, progress_done, progress_total);
        Ok(lib)
    }

    /// The storage the library writes to (the device's first).
    pub fn storage(&self) -> StorageId {
        self.storage
    }

    /// A cached artist by name.
    pub fn artist(&self, name: &str) -> Option<&Artist> {
        self.artists.get(normalized_artist(name))
    }

    /// A cached album by artist and name.
    pub fn album(&self, artist: &str, name: &str) -> Option<&Album> {
        self.albums
            .get(&(normalized_artist(artist).to_string(), normalized_album(name).to_string()))
    }

    /// All cached albums of one artist.
    pub fn albums_by_artist(&self, artist: &str) -> Vec<&Album> {
        let key = normalized_artist(artist);
        self.albums.values().filter(|a| a.artist == key).collect()
    }

    /// Returns the cached artist, creating it on the device when missing.
    pub fn get_or_create_artist(&mut self, name: &str) -> Result<&Artist> {
        let key = normalized_artist(name).to_string();
        if !self.artists.contains_key(&key) {
            self.create_artist_entry(&key)?;
        }
        Ok(&self.artists[&key])
    }

    /// Returns the cached album, creating it on the device when missing.
    pub fn get_or_create_album(&mut self, artist: &str, name: &str, year: u16) -> Result<&Album> {
        let artist_key = normalized_artist(artist).to_string();
        let album_key = normalized_album(name).to_string();
        if !self.artists.contains_key(&artist_key) {
            self.create_artist_entry(&artist_key)?;
        }
        let key = (artist_key.clone(), album_key.clone());
        if !self.albums.contains_key(&key) {
            self.create_album_entry(&artist_key, &album_key, year)?;
        }
        Ok(&self.albums[&key])
    }

    /// Whether the album already references a track of this name and index.
    pub fn has_track(&mut self, artist: &str, album: &str, name: &str, index: u32) -> Result<bool> {
        let Some(key) = self.album_key(artist, album) else {
            return Ok(false);
        };
        self.load_refs_by_key(&key)?;
        Ok(self.albums[&key]
            .tracks
            .iter()
            .any(|(n, i)| n == name && *i == index))
    }

    /// Creates a track object from a property list and immediately streams
    /// its body. The caller links it with
    /// [`add_track`](Self::add_track) afterwards.
    #[allow(clippy::too_many_arguments)]
    pub fn create_track(
        &mut self,
        artist: &str,
        album: &str,
        format: ObjectFormat,
        name: &str,
        genre: &str,
        index: u32,
        filename: &str,
        source: &mut dyn Read,
        size: u64,
    ) -> Result<NewTrack> {
        let artist_key = normalized_artist(artist).to_string();
        let album_folder = self
            .album(artist, album)
            .ok_or(Error::Internal("track created before its album"))?
            .music_folder;
        let artist_ref = self.artist_ref_value(&artist_key)?;

        let mut props = PropertyListBuilder::new();
        props
            .append(ObjectId(0), artist_ref.0, &artist_ref.1)
            .map_err(mtp::Error::from)?;
        props
            .append(ObjectId(0), ObjectProperty::NAME, &Value::Str(name.into()))
            .map_err(mtp::Error::from)?;
        if index != 0 {
            props
                .append(ObjectId(0), ObjectProperty::TRACK, &Value::U16(index as u16))
                .map_err(mtp::Error::from)?;
        }
        if !genre.is_empty() {
            props
                .append(ObjectId(0), ObjectProperty::GENRE, &Value::Str(genre.into()))
                .map_err(mtp::Error::from)?;
        }
        props
            .append(
                ObjectId(0),
                ObjectProperty::OBJECT_FILENAME,
                &Value::Str(filename.into()),
            )
            .map_err(mtp::Error::from)?;

        let created = self.session.send_object_prop_list(
            self.storage,
            album_folder,
            format,
            size,
            &props.finish(),
        )?;
        self.session.send_object(source, size)?;

        Ok(NewTrack {
            id: created.object,
            name: name.to_string(),
            index,
        })
    }

    /// Appends a track to the album's reference list, on the device and in
    /// the cache.
    pub fn add_track(&mut self, artist: &str, album: &str, track: &NewTrack) -> Result<()> {
        let key = self
            .album_key(artist, album)
            .ok_or(Error::Internal("add_track on an unknown album"))?;
        self.load_refs_by_key(&key)?;

        let album = self.albums.get_mut(&key).expect("key checked");
        let mut refs: Vec<ObjectId> = album.refs.iter().copied().collect();
        refs.push(track.id);
        self.session.set_object_references(album.id, &refs)?;
        album.refs.insert(track.id);
        album.tracks.push((track.name.clone(), track.index));
        Ok(())
    }

    /// Stores album cover art, when the device supports it.
    pub fn add_cover(&mut self, artist: &str, album: &str, data: &[u8]) -> Result<()> {
        if !self.album_cover_supported {
            debug!("album cover not supported, skipping");
            return Ok(());
        }
        let id = self
            .album(artist, album)
            .ok_or(Error::Internal("add_cover on an unknown album"))?
            .id;
        debug!("sending {} bytes of album cover", data.len());
        self.session
            .set_object_property_as_array(id, ObjectProperty::REPRESENTATIVE_SAMPLE_DATA, data)?;
        Ok(())
    }

    /// Loads the album's reference set and track list from the device.
    /// Cached after the first call.
    pub fn load_refs(&mut self, artist: &str, album: &str) -> Result<()> {
        let key = self
            .album_key(artist, album)
            .ok_or(Error::Internal("load_refs on an unknown album"))?;
        self.load_refs_by_key(&key)
    }

    /// Track handles referenced by an album.
    pub fn tracks_for_album(&mut self, artist: &str, album: &str) -> Result<Vec<ObjectId>> {
        let key = self
            .album_key(artist, album)
            .ok_or(Error::Internal("unknown album"))?;
        self.load_refs_by_key(&key)?;
        Ok(self.albums[&key].refs.iter().copied().collect())
    }

    /// Rebinds an album to another artist, locally and on the device.
    pub fn update_album_artist(&mut self, artist: &str, album: &str, new_artist: &str) -> Result<()> {
        let old_key = self
            .album_key(artist, album)
            .ok_or(Error::Internal("unknown album"))?;
        let new_key = normalized_artist(new_artist).to_string();
        if !self.artists.contains_key(&new_key) {
            self.create_artist_entry(&new_key)?;
        }

        let album_id = self.albums[&old_key].id;
        let artist_ref = self.artist_ref_value(&new_key)?;
        self.session
            .set_object_property(album_id, artist_ref.0, &artist_ref.1)?;

        let mut album = self
            .albums
            .remove(&old_key)
            .ok_or(Error::Internal("album vanished during rebind"))?;
        album.artist = new_key.clone();
        self.albums.insert((new_key, album.name.clone()), album);
        Ok(())
    }

    /// Rebinds a track to another artist on the device.
    pub fn update_track_artist(&mut self, track: ObjectId, new_artist: &str) -> Result<()> {
        let key = normalized_artist(new_artist).to_string();
        if !self.artists.contains_key(&key) {
            self.create_artist_entry(&key)?;
        }
        let artist_ref = self.artist_ref_value(&key)?;
        self.session
            .set_object_property(track, artist_ref.0, &artist_ref.1)?;
        Ok(())
    }

    // Internals -----------------------------------------------------------

    fn album_key(&self, artist: &str, album: &str) -> Option<AlbumKey> {
        let key = (
            normalized_artist(artist).to_string(),
            normalized_album(album).to_string(),
        );
        self.albums.contains_key(&key).then_some(key)
    }

    fn load_refs_by_key(&mut self, key: &AlbumKey) -> Result<()> {
        if self.albums[key].refs_loaded {
            return Ok(());
        }
        let id = self.albums[key].id;
        let refs = self.session.get_object_references(id)?;
        let mut tracks = Vec::with_capacity(refs.len());
        for track in &refs {
            let name = self
                .session
                .get_object_string_property(*track, ObjectProperty::NAME)?;
            let index = self
                .session
                .get_object_integer_property(*track, ObjectProperty::TRACK)?;
            debug!("[{index}]: {name}");
            tracks.push((name, index as u32));
        }
        let album = self.albums.get_mut(key).expect("key checked");
        album.refs = refs.into_iter().collect();
        album.tracks = tracks;
        album.refs_loaded = true;
        Ok(())
    }

    /// The artist reference written on albums and tracks: the artist
    /// object id, or the plain name on devices without artist objects.
    fn artist_ref_value(&self, artist_key: &str) -> Result<(ObjectProperty, Value)> {
        if self.artist_supported {
            let id = self
                .artists
                .get(artist_key)
                .ok_or(Error::Internal("artist reference to unknown artist"))?
                .id;
            Ok((ObjectProperty::ARTIST_ID, Value::U32(id.0)))
        } else {
            Ok((
                ObjectProperty::ARTIST,
                Value::Str(artist_key.to_string()),
            ))
        }
    }

    fn create_artist_entry(&mut self, name: &str) -> Result<()> {
        let name = normalized_artist(name).to_string();
        let music_folder = self.resolve_child_folder(self.music_folder, &name)?;

        let mut id = ObjectId(0);
        if self.artist_supported {
            let mut props = PropertyListBuilder::new();
            props
                .append(ObjectId(0), ObjectProperty::NAME, &Value::Str(name.clone()))
                .map_err(mtp::Error::from)?;
            props
                .append(
                    ObjectId(0),
                    ObjectProperty::OBJECT_FILENAME,
                    &Value::Str(format!("{name}.art")),
                )
                .map_err(mtp::Error::from)?;
            let created = self.session.send_object_prop_list(
                self.storage,
                self.artists_folder,
                ObjectFormat::ARTIST,
                0,
                &props.finish(),
            )?;
            self.session.send_object(&mut std::io::empty(), 0)?;
            id = created.object;
        }

        self.artists.insert(
            name.clone(),
            Artist {
                id,
                music_folder,
                name,
                guid: None,
            },
        );
        Ok(())
    }

    fn create_album_entry(&mut self, artist_key: &str, name: &str, year: u16) -> Result<()> {
        let artist = self
            .artists
            .get(artist_key)
            .ok_or(Error::Internal("album for unknown artist"))?;
        let artist_name = artist.name.clone();
        let artist_music_folder = artist.music_folder;
        let send_year = year != 0 && self.album_date_authored_supported;

        let artist_ref = self.artist_ref_value(artist_key)?;
        let mut props = PropertyListBuilder::new();
        props
            .append(ObjectId(0), artist_ref.0, &artist_ref.1)
            .map_err(mtp::Error::from)?;
        props
            .append(ObjectId(0), ObjectProperty::NAME, &Value::Str(name.to_string()))
            .map_err(mtp::Error::from)?;
        props
            .append(
                ObjectId(0),
                ObjectProperty::OBJECT_FILENAME,
                &Value::Str(format!("{artist_name}--{name}.alb")),
            )
            .map_err(mtp::Error::from)?;
        if send_year {
            props
                .append(
                    ObjectId(0),
                    ObjectProperty::DATE_AUTHORED,
                    &Value::Str(format_year(year)),
                )
                .map_err(mtp::Error::from)?;
        }

        let music_folder = self.resolve_child_folder(artist_music_folder, name)?;
        let created = self.session.send_object_prop_list(
            self.storage,
            self.albums_folder,
            ObjectFormat::ABSTRACT_AUDIO_ALBUM,
            0,
            &props.finish(),
        )?;

        self.albums.insert(
            (artist_key.to_string(), name.to_string()),
            Album {
                id: created.object,
                music_folder,
                artist: artist_key.to_string(),
                name: name.to_string(),
                year,
                refs: BTreeSet::new(),
                tracks: Vec::new(),
                refs_loaded: false,
            },
        );
        Ok(())
    }

    /// Finds a child association by name, creating it when absent.
    fn resolve_child_folder(&mut self, parent: ObjectId, name: &str) -> Result<ObjectId> {
        let children = self
            .session
            .get_object_handles(self.storage, ObjectFormat::ASSOCIATION, parent)?;
        for child in children.handles {
            let child_name = self
                .session
                .get_object_string_property(child, ObjectProperty::OBJECT_FILENAME)?;
            if child_name == name {
                return Ok(child);
            }
        }
        self.create_folder(name, parent)
    }

    fn create_folder(&mut self, name: &str, parent: ObjectId) -> Result<ObjectId> {
        let created = self.session.create_directory(name, parent, self.storage)?;
        Ok(created.object)
    }

    /// Children of `parent` that are associations, by file name.
    fn list_associations(&mut self, parent: ObjectId) -> Result<HashMap<String, ObjectId>> {
        let data = self.session.get_object_property_list(
            parent,
            ObjectFormat::ASSOCIATION,
            ObjectProperty::OBJECT_FILENAME,
            0,
            1,
        )?;
        let mut out = HashMap::new();
        proplist::parse_with(&data, proplist::decode_string, |id, _, name| {
            if let Some(name) = name {
                out.insert(name, id);
            }
        })
        .map_err(mtp::Error::from)?;
        Ok(out)
    }

    #[cfg(feature = "zune-metadata")]
    fn fetch_artist_guid(&mut self, artist: ObjectId) -> Option<[u8; 16]> {
        match self
            .session
            .get_object_property(artist, ObjectProperty::ZUNE_ARTIST_GUID)
        {
            Ok(data) if data.len() >= 16 => {
                let mut guid = [0u8; 16];
                guid.copy_from_slice(&data[..16]);
                Some(guid)
            }
            Ok(_) => None,
            Err(e) => {
                // Optional vendor probe; absence is expected.
                debug!("artist {artist} has no GUID: {e}");
                None
            }
        }
    }

    #[cfg(not(feature = "zune-metadata"))]
    fn fetch_artist_guid(&mut self, _artist: ObjectId) -> Option<[u8; 16]> {
        None
    }
}

impl<T: UsbTransport> std::fmt::Debug for Library<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("storage", &self.storage)
            .field("artists", &self.artists.len())
            .field("albums", &self.albums.len())
            .field("artist_supported", &self.artist_supported)
            .finish_non_exhaustive()
    }
}

fn normalized_artist(name: &str) -> &str {
    if name.is_empty() {
        UNKNOWN_ARTIST
    } else {
        name
    }
}

fn normalized_album(name: &str) -> &str {
    if name.is_empty() {
        UNKNOWN_ALBUM
    } else {
        name
    }
}

/// `DateAuthored` form of a bare year.
fn format_year(year: u16) -> String {
    format!("{year:04}0101T000000")
}

/// Year from a `DateAuthored` string; zero when absent or unparseable.
fn parse_year(date: &str) -> u16 {
    if date.len() < 4 {
        return 0;
    }
    date[..4].parse().unwrap_or_else(|_| {
        warn!("unparseable DateAuthored {date:?}");
        0
    })
}
