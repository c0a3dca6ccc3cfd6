//! Subsonic API response types
//!
//! Data structures for deserializing the JSON (`f=json`) flavour of the
//! Subsonic REST API, including the OpenSubsonic extensions Navidrome sends.

use bridge_traits::catalog::{RemoteAlbum, RemoteArtist, RemoteSong};
use serde::Deserialize;

/// Outer wrapper every endpoint returns.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "subsonic-response")]
    pub response: SubsonicResponse,
}

/// Body of `subsonic-response`. Only the element matching the endpoint is set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsonicResponse {
    /// `"ok"` or `"failed"`
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub error: Option<ApiError>,
    #[serde(default)]
    pub artists: Option<ArtistsIndex>,
    #[serde(default)]
    pub artist: Option<ArtistWithAlbums>,
    #[serde(default)]
    pub album: Option<AlbumWithSongs>,
    #[serde(default)]
    pub album_list2: Option<AlbumList>,
}

impl SubsonicResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// `getArtists` payload: artists grouped under alphabetical index letters.
#[derive(Debug, Default, Deserialize)]
pub struct ArtistsIndex {
    #[serde(default)]
    pub index: Vec<IndexEntry>,
}

impl ArtistsIndex {
    pub fn flatten(self) -> Vec<Artist> {
        self.index
            .into_iter()
            .flat_map(|entry| entry.artist)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: Vec<Artist>,
}

/// OpenSubsonic `ItemGenre`
#[derive(Debug, Deserialize)]
pub struct ItemGenre {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sort_name: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub album_count: Option<u32>,
    #[serde(default)]
    pub genres: Vec<ItemGenre>,
}

impl From<Artist> for RemoteArtist {
    fn from(artist: Artist) -> Self {
        RemoteArtist {
            id: artist.id,
            name: artist.name,
            sort_name: artist.sort_name.filter(|s| !s.is_empty()),
            genres: artist.genres.into_iter().map(|g| g.name).collect(),
            cover_art: artist.cover_art,
            album_count: artist.album_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArtistWithAlbums {
    #[serde(flatten)]
    pub artist: Artist,
    #[serde(default)]
    pub album: Vec<Album>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub song_count: Option<u32>,
}

impl From<Album> for RemoteAlbum {
    fn from(album: Album) -> Self {
        RemoteAlbum {
            id: album.id,
            name: album.name,
            artist: album.artist,
            artist_id: album.artist_id,
            year: album.year.filter(|y| *y > 0),
            genre: album.genre.filter(|g| !g.is_empty()),
            cover_art: album.cover_art,
            song_count: album.song_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AlbumWithSongs {
    #[serde(flatten)]
    pub album: Album,
    #[serde(default)]
    pub song: Vec<Song>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub track: Option<u32>,
    #[serde(default)]
    pub disc_number: Option<u32>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<u32>,
    /// OpenSubsonic field
    #[serde(default)]
    pub sampling_rate: Option<u32>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
}

impl From<Song> for RemoteSong {
    fn from(song: Song) -> Self {
        RemoteSong {
            id: song.id,
            title: song.title,
            artist: song.artist,
            album_id: song.album_id,
            album: song.album,
            track: song.track,
            disc_number: song.disc_number,
            duration: song.duration,
            year: song.year.filter(|y| *y > 0),
            genre: song.genre.filter(|g| !g.is_empty()),
            bit_rate: song.bit_rate,
            sample_rate: song.sampling_rate,
            suffix: song.suffix,
            cover_art: song.cover_art,
        }
    }
}

/// `getAlbumList2` payload
#[derive(Debug, Default, Deserialize)]
pub struct AlbumList {
    #[serde(default)]
    pub album: Vec<Album>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_index_flattens_across_letters() {
        let json = r#"{"subsonic-response":{"status":"ok","version":"1.16.1","artists":{
            "ignoredArticles":"The",
            "index":[
                {"name":"A","artist":[{"id":"ar-1","name":"Abba","albumCount":3}]},
                {"name":"B","artist":[{"id":"ar-2","name":"Blur"},{"id":"ar-3","name":"Bjork"}]}
            ]}}}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert!(envelope.response.is_ok());
        let artists = envelope.response.artists.unwrap().flatten();
        let ids: Vec<_> = artists.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["ar-1", "ar-2", "ar-3"]);
        assert_eq!(artists[0].album_count, Some(3));
    }

    #[test]
    fn test_failed_status_carries_error() {
        let json = r#"{"subsonic-response":{"status":"failed","version":"1.16.1",
            "error":{"code":70,"message":"Album not found"}}}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert!(!envelope.response.is_ok());
        let error = envelope.response.error.unwrap();
        assert_eq!(error.code, 70);
        assert_eq!(error.message, "Album not found");
    }

    #[test]
    fn test_song_conversion_keeps_disc_and_sampling_rate() {
        let song: Song = serde_json::from_str(
            r#"{"id":"s1","title":"Intro","discNumber":2,"track":5,
                "samplingRate":48000,"year":0,"genre":""}"#,
        )
        .unwrap();
        let remote = RemoteSong::from(song);
        assert_eq!(remote.disc_number, Some(2));
        assert_eq!(remote.track, Some(5));
        assert_eq!(remote.sample_rate, Some(48000));
        assert_eq!(remote.year, None);
        assert_eq!(remote.genre, None);
    }

    #[test]
    fn test_artist_genres_flattened() {
        let artist: Artist = serde_json::from_str(
            r#"{"id":"ar-1","name":"Blur","genres":[{"name":"Britpop"},{"name":"Rock"}]}"#,
        )
        .unwrap();
        let remote = RemoteArtist::from(artist);
        assert_eq!(remote.genres, vec!["Britpop", "Rock"]);
    }
}
