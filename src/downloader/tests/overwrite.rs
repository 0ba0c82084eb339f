use crate::config::OverwritePolicy;
use crate::downloader::test_helpers::*;
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime};

#[tokio::test]
async fn skip_leaves_existing_files_alone_and_touches_nothing() {
    let harness = harness(|config| {
        config.overwrite = OverwritePolicy::Skip;
    })
    .await;

    std::fs::create_dir_all(harness.out_dir()).unwrap();
    std::fs::write(harness.out_path(1), track(1).url).unwrap();

    let results = harness.downloader.download_songs(vec![track(1)]).await.unwrap();

    assert!(results[0].1.is_none());
    assert_eq!(harness.provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 0);
    assert!(harness.tags.embeds.lock().unwrap().is_empty());
    // The existing file is untouched
    assert_eq!(
        std::fs::read_to_string(harness.out_path(1)).unwrap(),
        track(1).url
    );
}

#[tokio::test]
async fn skip_also_applies_to_known_duplicates_under_other_names() {
    let harness = harness(|config| {
        config.overwrite = OverwritePolicy::Skip;
    })
    .await;

    std::fs::create_dir_all(harness.out_dir()).unwrap();
    let dup = harness.out_dir().join("Old Rip.mp3");
    std::fs::write(&dup, track(1).url).unwrap();
    harness
        .downloader
        .known_songs
        .lock()
        .await
        .insert(track(1).url, dup.clone());

    let results = harness.downloader.download_songs(vec![track(1)]).await.unwrap();

    assert!(results[0].1.is_none());
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 0);
    assert!(dup.exists());
}

#[tokio::test]
async fn force_deletes_duplicates_and_downloads_fresh() {
    let harness = harness(|config| {
        config.overwrite = OverwritePolicy::Force;
    })
    .await;

    std::fs::create_dir_all(harness.out_dir()).unwrap();
    let dup_a = harness.out_dir().join("Old Rip.mp3");
    let dup_b = harness.out_dir().join("Older Rip.mp3");
    std::fs::write(&dup_a, track(1).url).unwrap();
    std::fs::write(&dup_b, track(1).url).unwrap();
    {
        let mut known = harness.downloader.known_songs.lock().await;
        known.insert(track(1).url, dup_a.clone());
        known.insert(track(1).url, dup_b.clone());
    }

    let results = harness.downloader.download_songs(vec![track(1)]).await.unwrap();

    assert_eq!(results[0].1.as_deref(), Some(harness.out_path(1).as_path()));
    assert!(!dup_a.exists());
    assert!(!dup_b.exists());
    assert!(harness.out_path(1).exists());
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn metadata_relocates_the_most_recent_duplicate_without_downloading() {
    let harness = harness(|config| {
        config.overwrite = OverwritePolicy::Metadata;
    })
    .await;

    std::fs::create_dir_all(harness.out_dir()).unwrap();
    let older = harness.out_dir().join("Older Rip.mp3");
    let newer = harness.out_dir().join("Newer Rip.mp3");
    std::fs::write(&older, track(1).url).unwrap();
    std::fs::write(&newer, track(1).url).unwrap();

    let past = SystemTime::now() - Duration::from_secs(3600);
    std::fs::File::options()
        .write(true)
        .open(&older)
        .unwrap()
        .set_modified(past)
        .unwrap();

    {
        let mut known = harness.downloader.known_songs.lock().await;
        known.insert(track(1).url, older.clone());
        known.insert(track(1).url, newer.clone());
    }

    let results = harness.downloader.download_songs(vec![track(1)]).await.unwrap();

    // The freshest duplicate moved to the canonical path and got re-tagged;
    // nothing was downloaded or transcoded
    assert_eq!(results[0].1.as_deref(), Some(harness.out_path(1).as_path()));
    assert!(harness.out_path(1).exists());
    assert!(!older.exists());
    assert!(!newer.exists());
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.transcoder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.tags.embeds.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn default_policy_redownloads_over_existing_output() {
    let harness = harness(|_| {}).await;

    std::fs::create_dir_all(harness.out_dir()).unwrap();
    std::fs::write(harness.out_path(1), "stale content").unwrap();

    let results = harness.downloader.download_songs(vec![track(1)]).await.unwrap();

    assert!(results[0].1.is_some());
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 1);
    // The embed step rewrote the file with the track identity
    assert_eq!(
        std::fs::read_to_string(harness.out_path(1)).unwrap(),
        track(1).url
    );
}

#[tokio::test]
async fn startup_scan_feeds_the_duplicate_index() {
    let harness = harness_seeded(
        |root| {
            let out_dir = root.join("music");
            std::fs::create_dir_all(&out_dir).unwrap();
            std::fs::write(out_dir.join("Renamed Long Ago.mp3"), track(1).url).unwrap();
        },
        |config| {
            config.scan_for_songs = true;
            config.overwrite = OverwritePolicy::Skip;
        },
    )
    .await;

    let results = harness.downloader.download_songs(vec![track(1)]).await.unwrap();

    // The scan discovered the renamed file, so skip applies even though
    // the canonical output path does not exist
    assert!(results[0].1.is_none());
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 0);
}
