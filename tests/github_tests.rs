//! GitHub client behaviour against a local mock server.

use dreamassembler::github::checksum_sidecar;
use dreamassembler::{BulkArchiveSource, Error, GithubClient, ModDownloader, ModEntry, Side};
use mockito::{Matcher, Server, ServerGuard};
use std::fs;
use tempfile::TempDir;

const ORG: &str = "GTNewHorizons";

fn client(server: &ServerGuard) -> GithubClient {
    GithubClient::new(&server.url(), ORG, None).unwrap()
}

fn release_json(server: &ServerGuard, tag: &str, assets: &[(&str, u32)]) -> String {
    let assets: Vec<serde_json::Value> = assets
        .iter()
        .map(|(name, id)| {
            serde_json::json!({
                "name": name,
                "url": format!("{}/assets/{}", server.url(), id),
                "browser_download_url": format!("https://example.invalid/{}", name),
            })
        })
        .collect();
    serde_json::json!({ "tag_name": tag, "name": tag, "assets": assets }).to_string()
}

mod repos {
    use super::*;

    #[test]
    fn test_get_repo_reads_license() {
        let mut server = Server::new();
        let _m = server
            .mock("GET", "/repos/GTNewHorizons/NotEnoughItems")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"name":"NotEnoughItems","full_name":"GTNewHorizons/NotEnoughItems",
                    "license":{"spdx_id":"LGPL-3.0","name":"GNU Lesser General Public License v3.0"}}"#,
            )
            .create();

        let repo = client(&server).get_repo("NotEnoughItems").unwrap();

        assert_eq!(repo.name, "NotEnoughItems");
        assert_eq!(
            repo.license.and_then(|l| l.spdx_id).as_deref(),
            Some("LGPL-3.0")
        );
    }

    #[test]
    fn test_missing_repo_is_not_found() {
        let mut server = Server::new();
        let _m = server
            .mock("GET", "/repos/GTNewHorizons/Nope")
            .with_status(404)
            .create();

        let err = client(&server).get_repo("Nope").unwrap_err();

        assert!(matches!(err, Error::RepoNotFound(ref name) if name == "Nope"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_latest_release_is_not_found() {
        let mut server = Server::new();
        let _m = server
            .mock("GET", "/repos/GTNewHorizons/Empty/releases/latest")
            .with_status(404)
            .create();

        let err = client(&server).latest_release("Empty").unwrap_err();

        assert!(matches!(err, Error::LatestReleaseNotFound(_)));
    }

    #[test]
    fn test_unauthorized_is_reported() {
        let mut server = Server::new();
        let _m = server
            .mock("GET", "/repos/GTNewHorizons/Private")
            .with_status(401)
            .create();

        let err = client(&server).get_repo("Private").unwrap_err();

        assert!(!err.is_not_found());
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_token_is_sent() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/repos/GTNewHorizons/Secret")
            .match_header("authorization", "token s3cret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"Secret"}"#)
            .create();

        let client = GithubClient::new(&server.url(), ORG, Some("s3cret".to_string())).unwrap();
        client.get_repo("Secret").unwrap();

        mock.assert();
    }
}

mod mods {
    use super::*;

    #[test]
    fn test_download_mod_fetches_jars_once() {
        let mut server = Server::new();
        let body = release_json(
            &server,
            "2.3.1",
            &[
                ("NotEnoughItems-2.3.1.jar", 1),
                ("NotEnoughItems-2.3.1-dev.jar", 2),
            ],
        );
        let _release = server
            .mock("GET", "/repos/GTNewHorizons/NotEnoughItems/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(2)
            .create();
        let asset = server
            .mock("GET", "/assets/1")
            .match_header("accept", "application/octet-stream")
            .with_status(200)
            .with_body("jar-bytes")
            .expect(1)
            .create();

        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("mods");
        let entry = ModEntry::new("NotEnoughItems", Side::Both);
        let client = client(&server);

        let paths = client.download_mod(&entry, &destination).unwrap();
        assert_eq!(paths, vec![destination.join("NotEnoughItems-2.3.1.jar")]);
        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "jar-bytes");
        assert!(!destination.join("NotEnoughItems-2.3.1-dev.jar").exists());

        // Second call finds the jar on disk
        let again = client.download_mod(&entry, &destination).unwrap();
        assert_eq!(again, paths);
        asset.assert();
    }

    #[test]
    fn test_pinned_version_not_found() {
        let mut server = Server::new();
        let _m = server
            .mock("GET", "/repos/GTNewHorizons/Navigator/releases/tags/9.9.9")
            .with_status(404)
            .create();

        let temp = TempDir::new().unwrap();
        let mut entry = ModEntry::new("Navigator", Side::Client);
        entry.version = Some("9.9.9".to_string());

        let err = client(&server)
            .download_mod(&entry, temp.path())
            .unwrap_err();

        assert!(matches!(err, Error::ReleaseNotFound(ref name) if name == "Navigator"));
    }

    #[test]
    fn test_release_without_jar_is_not_found() {
        let mut server = Server::new();
        let body = release_json(&server, "1.0", &[("sources.zip", 3)]);
        let _m = server
            .mock("GET", "/repos/GTNewHorizons/NoJar/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create();

        let temp = TempDir::new().unwrap();
        let err = client(&server)
            .download_mod(&ModEntry::new("NoJar", Side::Both), temp.path())
            .unwrap_err();

        assert!(err.is_not_found());
    }
}

mod bulk {
    use super::*;

    fn modpack_release(server: &mut ServerGuard) -> mockito::Mock {
        let body = release_json(server, "2.1.0", &[("GTNH-2.1.0-extras.zip", 7)]);
        server
            .mock(
                "GET",
                "/repos/GTNewHorizons/GT-New-Horizons-Modpack/releases/latest",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create()
    }

    #[test]
    fn test_bulk_archive_is_cached_with_checksum() {
        let mut server = Server::new();
        let _release = modpack_release(&mut server);
        let asset = server
            .mock("GET", "/assets/7")
            .with_status(200)
            .with_body("zip-bytes")
            .expect(1)
            .create();

        let temp = TempDir::new().unwrap();
        let client = client(&server);

        let path = client.fetch_bulk_archive(temp.path()).unwrap();
        assert_eq!(path, temp.path().join("GTNH-2.1.0-extras.zip"));
        assert!(checksum_sidecar(&path).exists());

        let cached = client.fetch_bulk_archive(temp.path()).unwrap();
        assert_eq!(cached, path);
        asset.assert();
    }

    #[test]
    fn test_corrupt_cached_archive_is_downloaded_again() {
        let mut server = Server::new();
        let _release = modpack_release(&mut server);
        let asset = server
            .mock("GET", "/assets/7")
            .with_status(200)
            .with_body("zip-bytes")
            .expect(2)
            .create();

        let temp = TempDir::new().unwrap();
        let client = client(&server);

        let path = client.fetch_bulk_archive(temp.path()).unwrap();
        fs::write(&path, "zip-by").unwrap();

        client.fetch_bulk_archive(temp.path()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "zip-bytes");
        asset.assert();
    }

    #[test]
    fn test_unverified_cache_is_trusted_when_disabled() {
        let mut server = Server::new();
        let _release = modpack_release(&mut server);
        let asset = server
            .mock("GET", "/assets/7")
            .with_status(200)
            .with_body("zip-bytes")
            .expect(0)
            .create();

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("GTNH-2.1.0-extras.zip"), "local").unwrap();

        let client = client(&server).with_checksum_verification(false);
        let path = client.fetch_bulk_archive(temp.path()).unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "local");
        asset.assert();
    }

    #[test]
    fn test_release_without_zip_is_not_found() {
        let mut server = Server::new();
        let body = release_json(&server, "2.1.0", &[("changelog.md", 8)]);
        let _m = server
            .mock(
                "GET",
                "/repos/GTNewHorizons/GT-New-Horizons-Modpack/releases/latest",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create();

        let temp = TempDir::new().unwrap();
        let err = client(&server).fetch_bulk_archive(temp.path()).unwrap_err();

        assert!(matches!(err, Error::LatestReleaseNotFound(_)));
    }

    #[test]
    fn test_custom_modpack_repo() {
        let mut server = Server::new();
        let _m = server
            .mock("GET", "/repos/GTNewHorizons/Other-Pack/releases/latest")
            .with_status(404)
            .create();

        let temp = TempDir::new().unwrap();
        let err = client(&server)
            .with_modpack_repo("Other-Pack")
            .fetch_bulk_archive(temp.path())
            .unwrap_err();

        assert!(matches!(err, Error::LatestReleaseNotFound(ref repo) if repo == "Other-Pack"));
    }
}

#[test]
fn test_repo_names_are_url_encoded() {
    let mut server = Server::new();
    let mock = server
        .mock(
            "GET",
            Matcher::Regex(r"^/repos/GTNewHorizons/My%20Mod$".to_string()),
        )
        .with_status(404)
        .create();

    assert!(client(&server).get_repo("My Mod").is_err());
    mock.assert();
}
