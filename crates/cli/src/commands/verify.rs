use anyhow::{anyhow, bail, Context};
use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use arbor_kernel::root::{audit_log_chain, audit_map_chain};
use arbor_kernel::{DigitallySigned, Revision, SignatureAlgorithm, TreeId, TreeType};

use crate::ledger::Ledger;

/// One problem found while verifying a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub revision: Option<Revision>,
    pub problem: String,
}

pub fn run(storage_path: &str, tree_id: i64, public_key_path: &str) -> anyhow::Result<()> {
    let ledger = Ledger::load(storage_path)?;
    let pem = std::fs::read_to_string(public_key_path)
        .with_context(|| format!("failed to read public key {}", public_key_path))?;
    let key = VerifyingKey::from_public_key_pem(&pem).map_err(|e| anyhow!("invalid public key: {}", e))?;

    let id = TreeId(tree_id);
    let (checked, findings) = verify_tree(&ledger, id, &key)?;

    if findings.is_empty() {
        println!("\n✅ VERIFIED\n");
        println!("Tree:          {}", id);
        println!("Roots checked: {}", checked);
        println!("Key:           {}\n", hex::encode(&key.to_bytes()[..8]));
        Ok(())
    } else {
        println!("\n❌ VERIFICATION FAILED\n");
        for f in &findings {
            match f.revision {
                Some(r) => println!("revision {}: {}", r, f.problem),
                None => println!("chain: {}", f.problem),
            }
        }
        println!();
        bail!("{} problem(s) found in tree {}", findings.len(), id)
    }
}

/// Check every stored root of `id`: scheme, signature over the canonical
/// bytes, and the revision chain. Returns the number of roots checked.
pub fn verify_tree(ledger: &Ledger, id: TreeId, key: &VerifyingKey) -> anyhow::Result<(usize, Vec<Finding>)> {
    let tree = ledger.tree(id).ok_or_else(|| anyhow!("tree {} not found", id))?;
    let mut findings = Vec::new();

    let checked = match tree.tree_type {
        TreeType::Log => {
            let roots = ledger.log_roots(id);
            for root in roots {
                check_signature(&root.signature, &root.root.canonical_bytes(), key, root.revision(), &mut findings);
            }
            let chain: Vec<_> = roots.iter().map(|r| r.root.clone()).collect();
            if let Err(v) = audit_log_chain(id, &chain) {
                findings.push(Finding { revision: None, problem: v.to_string() });
            }
            roots.len()
        }
        TreeType::Map => {
            let roots = ledger.map_roots(id);
            for root in roots {
                check_signature(&root.signature, &root.root.canonical_bytes(), key, root.revision(), &mut findings);
            }
            let chain: Vec<_> = roots.iter().map(|r| r.root.clone()).collect();
            if let Err(v) = audit_map_chain(id, &chain) {
                findings.push(Finding { revision: None, problem: v.to_string() });
            }
            roots.len()
        }
        TreeType::Unknown => bail!("tree {} has no type", id),
    };

    Ok((checked, findings))
}

fn check_signature(
    signed: &DigitallySigned,
    message: &[u8],
    key: &VerifyingKey,
    revision: Revision,
    findings: &mut Vec<Finding>,
) {
    let problem = if signed.signature_algorithm != SignatureAlgorithm::Ed25519 {
        format!("unsupported signature algorithm {:?}", signed.signature_algorithm)
    } else {
        match Signature::from_slice(&signed.signature) {
            Err(_) => format!("malformed signature ({} bytes)", signed.signature.len()),
            Ok(sig) => match key.verify(message, &sig) {
                Ok(()) => return,
                Err(_) => "signature does not match root".to_string(),
            },
        }
    };
    findings.push(Finding {
        revision: Some(revision),
        problem,
    });
}
