//! Gavel Control Plane — Demo CLI
//!
//! Runs one or all of the five governance scenarios in-process: real policy
//! engine, real hash-chained ledger, real approval registry, with the
//! in-process fake standing in for the Docker sandbox.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- benign-read
//!   cargo run -p demo -- hard-denial
//!   cargo run -p demo -- escalation
//!   cargo run -p demo -- execution
//!   cargo run -p demo -- tamper-detection

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use gavel_blastbox::{compute_hash, FakeSandbox, Sandbox};
use gavel_contracts::Decision;
use gavel_gateway::dto::{ProposeRequest, ResolveRequest};
use gavel_gateway::{service, AppState, GavelConfig};
use gavel_identity::IdentityRegistry;
use gavel_policy::PolicyEngine;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Gavel — governance control plane demo.
///
/// Each subcommand walks one end-to-end scenario through the real
/// components: audit spine, policy engine, approval registry, blast box.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Gavel governance control plane demo",
    long_about = "Walks the Gavel governance scenarios end to end:\n\
                  policy approval and denial, human escalation with one-shot\n\
                  approval consumption, sandboxed execution with evidence\n\
                  packets, and audit chain tamper detection."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all five scenarios in sequence.
    RunAll,
    /// Scenario 1: benign read → APPROVED, two chained events.
    BenignRead,
    /// Scenario 2: `sudo rm -rf /` → DENIED with enumerated violations.
    HardDenial,
    /// Scenario 3: escalate → human approval → one-shot consumed re-submit.
    Escalation,
    /// Scenario 4: sandboxed execution with a verifiable evidence packet.
    Execution,
    /// Scenario 5: out-of-band mutation caught by chain verification.
    TamperDetection,
}

// ── Entry point ───────────────────────────────────────────────────────────────

type DemoResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all().await,
        Command::BenignRead => benign_read().await,
        Command::HardDenial => hard_denial().await,
        Command::Escalation => escalation().await,
        Command::Execution => execution().await,
        Command::TamperDetection => tamper_detection().await,
    };

    match result {
        Ok(()) => println!("\nAll selected scenarios completed successfully."),
        Err(e) => {
            eprintln!("Demo error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_banner() {
    println!();
    println!("GAVEL — Governance Control Plane");
    println!("================================");
    println!();
    println!("Pipeline per proposal:");
    println!("  [1] INBOUND_INTENT appended to the hash-chained Audit Spine");
    println!("  [2] Policy engine: hard rules deny, risk >= 0.8 escalates");
    println!("  [3] Escalations wait for a one-shot, TTL-bounded human grant");
    println!("  [4] Approved actions run in the Blast Box (no network, read-only root)");
    println!("  [5] Evidence packet hashed and chained into the Spine");
    println!();
}

// ── Shared setup ──────────────────────────────────────────────────────────────

const IDENTITIES: &str = r#"{
    "actors": {
        "agent:coder": { "role": "agent", "status": "active", "tier": 1 },
        "human:alice": { "role": "admin", "status": "active", "tier": 3 }
    }
}"#;

fn demo_state(sandbox: Arc<dyn Sandbox>) -> DemoResult<(AppState, tempfile::TempDir)> {
    let workspace = tempfile::tempdir()?;
    let config = GavelConfig {
        database_url: ":memory:".to_string(),
        human_api_key: "demo-key".to_string(),
        blastbox_workspace: workspace.path().to_path_buf(),
        ..GavelConfig::default()
    };
    let identities = IdentityRegistry::from_json_str(IDENTITIES)?;
    let state = AppState::assemble(config, identities, PolicyEngine::builtin(), sandbox)?;
    Ok((state, workspace))
}

fn request(actor: &str, action_type: &str, content: &str) -> ProposeRequest {
    ProposeRequest {
        actor_id: actor.to_string(),
        action_type: action_type.to_string(),
        content: json!(content),
    }
}

fn demo_err(e: gavel_gateway::GatewayError) -> Box<dyn std::error::Error + Send + Sync> {
    format!("{e:?}").into()
}

async fn run_all() -> DemoResult {
    benign_read().await?;
    hard_denial().await?;
    escalation().await?;
    execution().await?;
    tamper_detection().await?;
    Ok(())
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

async fn benign_read() -> DemoResult {
    println!("— Scenario 1: benign read ———————————————————————————————");
    let (state, _ws) = demo_state(Arc::new(FakeSandbox::succeeding("")))?;

    let response = service::propose(&state, &request("agent:coder", "file_read", "src/main.py"))
        .await
        .map_err(demo_err)?;

    println!("  decision:    {}", response.decision);
    println!("  risk score:  {:.2}", response.risk_score);
    println!("  intent:      {}", response.intent_event_id);
    println!("  evaluation:  {}", response.policy_event_id);

    let report = state.ledger.verify(0)?;
    println!(
        "  chain:       {} events, valid={}",
        report.total_events, report.chain_valid
    );
    Ok(())
}

async fn hard_denial() -> DemoResult {
    println!("— Scenario 2: hard denial ———————————————————————————————");
    let (state, _ws) = demo_state(Arc::new(FakeSandbox::succeeding("")))?;

    let response = service::propose(&state, &request("agent:coder", "bash", "sudo rm -rf /"))
        .await
        .map_err(demo_err)?;

    println!("  decision:    {}", response.decision);
    println!("  risk score:  {:.2}", response.risk_score);
    for violation in &response.violations {
        println!("  violation:   [{}] {}", violation.rule, violation.description);
    }
    Ok(())
}

async fn escalation() -> DemoResult {
    println!("— Scenario 3: escalation and one-shot approval ——————————");
    let (state, _ws) = demo_state(Arc::new(FakeSandbox::succeeding("")))?;
    let command = "kubectl scale deployment web --replicas=3";

    let escalated = service::propose(&state, &request("agent:coder", "bash", command))
        .await
        .map_err(demo_err)?;
    println!(
        "  first submit:  {} (risk {:.2})",
        escalated.decision, escalated.risk_score
    );

    let approval = service::approve(
        &state,
        &ResolveRequest {
            intent_event_id: escalated.intent_event_id,
            policy_event_id: escalated.policy_event_id,
            reason: None,
        },
    )
    .map_err(demo_err)?;
    println!("  human grant:   {}", approval.approval_event_id);

    let upgraded = service::propose(&state, &request("agent:coder", "bash", command))
        .await
        .map_err(demo_err)?;
    println!("  second submit: {} (grant consumed)", upgraded.decision);

    let third = service::propose(&state, &request("agent:coder", "bash", command))
        .await
        .map_err(demo_err)?;
    println!("  third submit:  {} (grant was one-shot)", third.decision);

    assert_eq!(upgraded.decision, Decision::Approved);
    assert_eq!(third.decision, Decision::Escalated);
    Ok(())
}

async fn execution() -> DemoResult {
    println!("— Scenario 4: sandboxed execution ———————————————————————");
    let sandbox = FakeSandbox::succeeding("hello from the blast box\n").with_side_effect(
        |workspace| {
            let _ = std::fs::write(workspace.join("result.txt"), "artifact");
        },
    );
    let (state, _ws) = demo_state(Arc::new(sandbox))?;

    let proposal = service::propose(
        &state,
        &request(
            "agent:coder",
            "bash",
            "echo 'hello from the blast box' > result.txt",
        ),
    )
    .await
    .map_err(demo_err)?;
    println!("  decision:      {}", proposal.decision);

    let executed = service::execute(&state, proposal.intent_event_id)
        .await
        .map_err(demo_err)?;
    let packet = &executed.evidence_packet;
    println!("  exit code:     {}", packet.exit_code);
    println!("  duration:      {} ms", packet.duration_ms);
    println!("  files added:   {:?}", packet.workspace_diff.added);
    println!("  evidence hash: {}…", &packet.evidence_hash[..16]);
    println!(
        "  recomputes:    {}",
        compute_hash(packet) == packet.evidence_hash
    );

    let report = state.ledger.verify(0)?;
    println!(
        "  chain:         {} events, valid={}",
        report.total_events, report.chain_valid
    );
    Ok(())
}

async fn tamper_detection() -> DemoResult {
    println!("— Scenario 5: tamper detection ——————————————————————————");
    let (state, _ws) = demo_state(Arc::new(FakeSandbox::succeeding("")))?;

    for i in 0..3 {
        service::propose(
            &state,
            &request("agent:coder", "file_read", &format!("docs/page-{i}.md")),
        )
        .await
        .map_err(demo_err)?;
    }
    println!(
        "  before mutation: valid={}",
        state.ledger.verify(0)?.chain_valid
    );

    // An attacker with raw storage access sidesteps the trigger interlock.
    let victim = state.ledger.list(&Default::default(), 0, 10)?[2].id;
    {
        let guard = state.ledger.lock()?;
        let conn = guard.connection();
        conn.execute("DROP TRIGGER audit_events_no_update", [])
            .map_err(|e| format!("demo tamper step failed: {e}"))?;
        conn.execute(
            "UPDATE audit_events SET actor_id = 'agent:evil' WHERE id = ?1",
            [victim.to_string()],
        )
        .map_err(|e| format!("demo tamper step failed: {e}"))?;
        conn.execute_batch(
            "CREATE TRIGGER audit_events_no_update
             BEFORE UPDATE ON audit_events
             BEGIN SELECT RAISE(ABORT, 'audit_events is append-only'); END;",
        )
        .map_err(|e| format!("demo tamper step failed: {e}"))?;
    }

    let report = state.ledger.verify(0)?;
    println!("  after mutation:  valid={}", report.chain_valid);
    println!(
        "  break at:        {}",
        report
            .break_at
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    assert!(!report.chain_valid);
    assert_eq!(report.break_at, Some(victim));
    Ok(())
}
