//! Manages the download of course archives from the shared drive folder.
//!
//! Archives are fetched once: a file already present in the staging directory is never
//! downloaded again. Failures to download a single file are logged and the remaining files are
//! still processed, so a missing archive only results in missing lessons downstream.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::{
    ffi::OsStr,
    fs::{self, File},
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::{auth::CredentialProvider, error::FetchError};

/// The base URL of the Drive v3 API.
const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/";

/// The MIME type of folders, which are never downloaded.
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// The maximum number of items listed from the folder.
const PAGE_SIZE: &str = "1000";

/// Timeout for each request. Archives can be large, so this is generous.
const HTTP_TIMEOUT: Duration = Duration::from_secs(600);

/// A file stored in the remote folder.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

/// A remote folder from which files can be listed and downloaded.
pub trait RemoteFolder {
    /// Lists the files directly inside the folder with the given ID.
    fn list_files(&mut self, folder_id: &str) -> Result<Vec<RemoteFile>, FetchError>;

    /// Downloads the given file to `dest`.
    fn download(&mut self, file: &RemoteFile, dest: &Path) -> Result<(), FetchError>;
}

/// The response of the file listing endpoint.
#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

/// Builds the HTTP client used for drive requests.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// A folder in Google Drive accessed through its REST API.
pub struct DriveFolder<C: CredentialProvider> {
    http: Client,
    credentials: C,
}

impl<C: CredentialProvider> DriveFolder<C> {
    /// Creates a folder client using the given credentials.
    pub fn new(http: Client, credentials: C) -> Self {
        Self { http, credentials }
    }

    /// Returns the URL of the given API endpoint.
    fn endpoint(path: &str) -> Result<Url> {
        Ok(Url::parse(DRIVE_API)?.join(path)?)
    }
}

impl<C: CredentialProvider> RemoteFolder for DriveFolder<C> {
    fn list_files(&mut self, folder_id: &str) -> Result<Vec<RemoteFile>, FetchError> {
        let token = self.credentials.bearer_token()?;
        let list = || -> Result<Vec<RemoteFile>> {
            let mut url = Self::endpoint("files")?;
            url.query_pairs_mut()
                .append_pair("q", &format!("'{folder_id}' in parents"))
                .append_pair("pageSize", PAGE_SIZE)
                .append_pair("fields", "files(id,name,mimeType)");
            let list = self
                .http
                .get(url)
                .bearer_auth(&token)
                .send()?
                .error_for_status()?
                .json::<FileList>()?;
            Ok(list.files)
        };
        list().map_err(|e| FetchError::ListFolder(folder_id.to_string(), e))
    }

    fn download(&mut self, file: &RemoteFile, dest: &Path) -> Result<(), FetchError> {
        let token = self.credentials.bearer_token()?;
        let download = || -> Result<()> {
            let mut url = Self::endpoint(&format!("files/{}", file.id))?;
            url.query_pairs_mut().append_pair("alt", "media");
            let mut response = self
                .http
                .get(url)
                .bearer_auth(&token)
                .send()?
                .error_for_status()?;
            let mut out = File::create(dest)?;
            let bytes = response.copy_to(&mut out)?;
            tracing::debug!("Downloaded {} bytes for {}", bytes, file.name);
            Ok(())
        };
        download().map_err(|e| FetchError::Download(file.name.clone(), e))
    }
}

/// Returns the path in the staging directory for the remote file with the given name. Only
/// names made of a single path component are accepted.
fn local_path(staging_dir: &Path, name: &str) -> Result<PathBuf, FetchError> {
    if Path::new(name).file_name() != Some(OsStr::new(name)) {
        return Err(FetchError::Download(
            name.to_string(),
            anyhow!("the name is not a plain file name"),
        ));
    }
    Ok(staging_dir.join(name))
}

/// Fetches archives from a remote folder into the staging directory.
pub struct AssetFetcher<R: RemoteFolder> {
    /// The folder from which files are fetched.
    remote: R,

    /// The directory where fetched files are stored.
    staging_dir: PathBuf,
}

impl<R: RemoteFolder> AssetFetcher<R> {
    /// Creates a fetcher that stores files in the given directory.
    pub fn new(remote: R, staging_dir: &Path) -> Self {
        Self {
            remote,
            staging_dir: staging_dir.to_path_buf(),
        }
    }

    /// Downloads a single file unless it already exists. The file is first written to a
    /// temporary file in the staging directory and only moved into place once complete.
    fn fetch_file(&mut self, file: &RemoteFile, dest: &Path) -> Result<(), FetchError> {
        if dest.exists() {
            tracing::info!("File already exists: {}", dest.display());
            return Ok(());
        }

        tracing::info!("Downloading {}", file.name);
        let temp_file = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(&self.staging_dir)
            .map_err(|e| FetchError::Download(file.name.clone(), e.into()))?;
        self.remote.download(file, temp_file.path())?;
        temp_file
            .persist(dest)
            .map_err(|e| FetchError::Download(file.name.clone(), e.into()))?;
        Ok(())
    }

    /// Fetches every file with the given MIME type from the folder and returns the local path of
    /// each one present in the staging directory afterwards.
    pub fn fetch(&mut self, folder_id: &str, mime_type: &str) -> Result<Vec<PathBuf>, FetchError> {
        fs::create_dir_all(&self.staging_dir)
            .map_err(|e| FetchError::ListFolder(folder_id.to_string(), e.into()))?;
        let files = self.remote.list_files(folder_id)?;

        let mut fetched = Vec::new();
        for file in files {
            if file.mime_type == FOLDER_MIME_TYPE || file.mime_type != mime_type {
                continue;
            }

            let result = local_path(&self.staging_dir, &file.name)
                .and_then(|dest| self.fetch_file(&file, &dest).map(|()| dest));
            match result {
                Ok(dest) => fetched.push(dest),
                Err(e) => tracing::warn!(
                    "Error downloading file {}: {:#}",
                    file.name,
                    anyhow::Error::from(e)
                ),
            }
        }
        Ok(fetched)
    }
}
