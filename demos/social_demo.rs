//! # Social Graph Demo
//!
//! This example walks the full friend lifecycle between two sessions:
//! 1. Asha sends Bela a friend request
//! 2. Bela accepts it and both rosters gain the counterpart
//! 3. Presence flows from one session to the other
//! 4. The free-tier quota denies a fourth friend
//! 5. A restarted session restores its roster from the snapshot
//!
//! ## Run
//!
//! ```bash
//! cargo run --example social_demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use kith_core::{
    AcceptOutcome, AddOutcome, Error, LoopbackRemote, NewFriend, SocialClient, SocialConfig,
    StaticAuth, StaticEntitlement, UserProfile,
};

#[tokio::main]
async fn main() {
    println!("=================================================");
    println!("            KITH SOCIAL GRAPH DEMO");
    println!("=================================================\n");

    // =========================================================================
    // STEP 1: Two sessions sharing one remote store
    // =========================================================================
    println!("1. Opening sessions for Asha and Bela...\n");

    let remote = Arc::new(LoopbackRemote::new());

    let snapshot_path = std::env::temp_dir().join("kith_social_demo.db");
    let _ = std::fs::remove_file(&snapshot_path);

    let asha = SocialClient::open(
        &SocialConfig::default(),
        &StaticAuth::new(UserProfile::new("u-asha", "Asha")),
        Arc::new(StaticEntitlement::free()),
        remote.clone(),
    )
    .expect("Failed to open Asha's session");

    let bela_config = SocialConfig {
        snapshot_path: Some(snapshot_path.to_string_lossy().into_owned()),
        ..SocialConfig::default()
    };
    let bela = SocialClient::open(
        &bela_config,
        &StaticAuth::new(UserProfile::new("u-bela", "Bela")),
        Arc::new(StaticEntitlement::free()),
        remote.clone(),
    )
    .expect("Failed to open Bela's session");

    asha.start().await.expect("Failed to start Asha's sync");
    bela.start().await.expect("Failed to start Bela's sync");

    println!("   Asha: {} (free tier, limit {})", asha.user().id, asha.free_limit());
    println!("   Bela: {} (free tier, limit {})", bela.user().id, bela.free_limit());
    println!();

    // =========================================================================
    // STEP 2: Asha sends a friend request
    // =========================================================================
    println!("2. Asha sends Bela a friend request...\n");

    let sent = asha
        .send_request("u-bela", "Bela", Some("Hey Bela! It's Asha.".to_string()))
        .await
        .expect("Failed to send request");

    println!("   Request ID: {}", sent.value.id);
    println!("   Confirmed by remote store: {}", sent.confirmed);
    println!();

    // =========================================================================
    // STEP 3: Bela accepts
    // =========================================================================
    println!("3. Bela checks her inbox and accepts...\n");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let pending = bela.pending_requests();
    println!("   Pending requests for Bela: {}", pending.len());
    for request in &pending {
        println!(
            "   - from {} ({}): {:?}",
            request.from_user_name, request.from_user_id, request.message
        );
    }

    let accepted = bela
        .accept_request(&pending[0].id)
        .await
        .expect("Failed to accept request");
    match &accepted.value {
        AcceptOutcome::Added(friend) => println!("   [OK] {} joined Bela's roster", friend.name),
        AcceptOutcome::AlreadyFriend => println!("   [OK] Already friends"),
        AcceptOutcome::FriendNotAdded(err) => println!("   [WARN] Accepted, but: {}", err),
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("   Asha's roster: {} friend(s)", asha.friends().len());
    println!("   Bela's roster: {} friend(s)", bela.friends().len());
    println!();

    // =========================================================================
    // STEP 4: Presence flows between sessions
    // =========================================================================
    println!("4. Asha comes online, then goes offline...\n");

    asha.set_online(true).await.expect("Failed to publish presence");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let asha_seen_by_bela = bela.get_friend("u-asha").expect("Asha missing from roster");
    println!("   Bela sees Asha online: {}", asha_seen_by_bela.is_online);

    asha.set_online(false).await.expect("Failed to publish presence");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let asha_seen_by_bela = bela.get_friend("u-asha").expect("Asha missing from roster");
    println!(
        "   Bela sees Asha offline, last seen {:?}",
        asha_seen_by_bela.last_seen.map(|t| t.to_rfc3339())
    );
    println!();

    // =========================================================================
    // STEP 5: The free-tier quota kicks in
    // =========================================================================
    println!("5. Bela imports friends until the quota says no...\n");

    for (id, name) in [("u-chike", "Chike"), ("u-devi", "Devi"), ("u-ejiro", "Ejiro")] {
        match bela.add_friend(NewFriend::new(id, name)) {
            Ok(AddOutcome::Added(friend)) => println!("   [OK] Added {}", friend.name),
            Ok(AddOutcome::AlreadyFriend) => println!("   [OK] {} already present", name),
            Err(Error::QuotaExceeded { limit }) => {
                println!("   [DENIED] {} rejected: free limit of {} reached", name, limit)
            }
            Err(err) => println!("   [FAIL] {}", err),
        }
    }

    let stats = bela.stats();
    println!(
        "\n   Bela's stats: {} total, {} online, {} favorites, {:?} free slot(s) left",
        stats.total, stats.online, stats.favorites, stats.remaining_free_slots
    );
    println!();

    // =========================================================================
    // STEP 6: Snapshot continuity across a restart
    // =========================================================================
    println!("6. Restarting Bela's session from its snapshot...\n");

    drop(bela);

    let restarted = SocialClient::open(
        &bela_config,
        &StaticAuth::new(UserProfile::new("u-bela", "Bela")),
        Arc::new(StaticEntitlement::free()),
        remote,
    )
    .expect("Failed to reopen Bela's session");

    println!("   Restored roster ({} friends):", restarted.friends().len());
    for friend in restarted.friends() {
        println!("   - {} ({})", friend.display_name(), friend.id);
    }

    let _ = std::fs::remove_file(&snapshot_path);

    println!("\n=================================================");
    println!("                 DEMO COMPLETE");
    println!("=================================================");
}
