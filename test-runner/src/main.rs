//! Test runner for the sandbox: deploys a contract touching every bridge
//! binding and numeric method, then calls each of its methods.
//!
//! Usage: `test-runner [config.json]`

use anyhow::{bail, Context};
use serde_json::json;
use tos_sandbox_sdk::*;

/// Exercises storage, context documents, the numeric model and the ledger
struct NormalTest;

impl NormalTest {
    fn storage_test(&self, scope: &mut Scope<'_, InvokeContext>) -> Result<(), ScriptError> {
        let (key, value) = (Value::from("key"), Value::from("value"));
        scope.call_method("storage", "put", &[key.clone(), value.clone()])?;
        scope.call_method("storage", "has", &[key.clone()])?;
        scope.call_method("storage", "get", &[key.clone()])?;
        scope.call_method("storage", "del", &[key])?;

        let (map, field) = (Value::from("mapkey"), Value::from("field"));
        scope.call_method("storage", "mapPut", &[map.clone(), field.clone(), value])?;
        scope.call_method("storage", "mapHas", &[map.clone(), field.clone()])?;
        scope.call_method("storage", "mapGet", &[map.clone(), field.clone()])?;
        scope.call_method("storage", "mapKeys", &[map.clone()])?;
        scope.call_method("storage", "mapLen", &[map.clone()])?;
        scope.call_method("storage", "mapDel", &[map, field])?;
        Ok(())
    }

    fn blockchain_test(&self, scope: &mut Scope<'_, InvokeContext>) -> Result<Value, ScriptError> {
        let number = scope.read("block", "number")?;
        scope.read("block", "time")?;
        scope.read("tx", "time")?;
        scope.read("tx", "hash")?;
        for document in ["blockInfo", "txInfo", "contextInfo"] {
            let text = scope.call_method("BlockChain", document, &[])?;
            scope.call_method("JSON", "parse", &[text])?;
        }
        let name = scope.call_method("BlockChain", "contractName", &[])?;
        let publisher = scope.call_method("BlockChain", "publisher", &[])?;
        scope.call_method("console", "log", &[name, publisher, number.clone()])?;
        Ok(number)
    }

    fn var_test(&self, scope: &mut Scope<'_, InvokeContext>) -> Result<Value, ScriptError> {
        let a = scope.decimal("12345.6789")?;
        let b = scope.invoke(&a, "minus", &[Value::Int(100)])?;
        for (method, arg) in [
            ("multi", Value::Int(12)),
            ("div", Value::Int(12)),
            ("mod", Value::Int(30)),
            ("pow", Value::Int(2)),
            ("eq", Value::Int(10)),
            ("gt", Value::Int(10)),
            ("gte", Value::Int(10)),
            ("lt", Value::Int(10)),
            ("lte", Value::Int(10)),
            ("toFixed", Value::Int(10)),
        ] {
            scope.invoke(&a, method, &[arg])?;
        }
        for method in ["negated", "isZero", "isPositive", "isNegative", "toString"] {
            scope.invoke(&a, method, &[])?;
        }

        let number = scope.integer("1234500000")?;
        let number2 = scope.invoke(&number, "minus", &[Value::Int(680)])?;
        for method in ["multi", "div", "mod", "pow"] {
            let arg = if method == "pow" { 2 } else { 12 };
            scope.invoke(&number, method, &[Value::Int(arg)])?;
        }
        Ok(Value::sequence(vec![b, number2]))
    }

    fn transfer(&self, scope: &mut Scope<'_, InvokeContext>, args: &[Value]) -> Result<(), ScriptError> {
        let from = args.first().cloned().unwrap_or_default();
        let to = args.get(1).cloned().unwrap_or_default();
        let amount = args.get(2).cloned().unwrap_or_default();
        let memo = Value::from("");
        scope.call_method("BlockChain", "transfer", &[from.clone(), to.clone(), amount.clone(), memo.clone()])?;
        scope.call_method("BlockChain", "deposit", &[from, amount.clone(), memo.clone()])?;
        scope.call_method("BlockChain", "withdraw", &[to, amount, memo])?;
        Ok(())
    }
}

impl Contract for NormalTest {
    fn abi(&self) -> &[&'static str] {
        &["storageTest", "blockchainTest", "varTest", "transfer", "test"]
    }

    fn call(
        &self,
        scope: &mut Scope<'_, InvokeContext>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ScriptError> {
        match method {
            "storageTest" => self.storage_test(scope).map(|()| Value::Undefined),
            "blockchainTest" => self.blockchain_test(scope),
            "varTest" => self.var_test(scope),
            "transfer" => self.transfer(scope, args).map(|()| Value::Undefined),
            "test" => {
                self.storage_test(scope)?;
                self.blockchain_test(scope)?;
                self.var_test(scope)
            }
            _ => Err(ScriptError::thrown(format!("unknown method {method}"))),
        }
    }
}

fn load_config() -> anyhow::Result<RuntimeConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(RuntimeConfig {
            debug: true,
            ..RuntimeConfig::default()
        });
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {path}"))?;
    RuntimeConfig::from_json(&text).with_context(|| format!("Invalid config in {path}"))
}

fn block_context() -> BlockContext {
    BlockContext {
        block: BlockInfo {
            number: 12345,
            parent_hash: "parent".into(),
            witness: "producer".into(),
            time: 1_541_541_540_000_000_000,
        },
        tx: TxInfo {
            time: 1_541_541_540_000_000_000,
            hash: "txhash".into(),
            publisher: "admin".into(),
            ..TxInfo::default()
        },
        caller: String::new(),
    }
}

fn balance(host: &ContractHost, account: &str) -> anyhow::Result<String> {
    let balance = host.state().accounts.balance(account)?;
    Ok(balance.map(|b| b.to_string()).unwrap_or_else(|| "0".into()))
}

fn main() -> anyhow::Result<()> {
    // Initialize simple logger with custom format
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "   {}", record.args())
        })
        .init();

    println!("=== TOS Sandbox - Normal Test Runner ===\n");

    // 1. Create host with a hardened isolate
    println!("1. Creating contract host and hardening the isolate...");
    let config = load_config()?;
    let mut ledger = MemoryLedger::new();
    ledger.open("admin", Decimal::parse("1000")?);
    ledger.open("user", Decimal::parse("0")?);
    let state = ChainState::new(Box::new(MemoryStorage::new()), Box::new(ledger));
    let mut host = ContractHost::new(config, state)?;
    println!(
        "   ✓ Host ready with {} compute units per call\n",
        host.config().compute_budget
    );

    // 2. Deploy
    println!("2. Deploying normal_test...");
    let receipt = host.deploy("normal_test", Box::new(NormalTest), block_context())?;
    println!("   ✓ Deployed ({} CU)\n", receipt.compute_units);

    // 3. Call each method
    println!("3. Calling contract methods...");
    println!("   --- Contract Output ---\n");
    let calls = [
        ("storageTest", vec![]),
        ("blockchainTest", vec![]),
        ("varTest", vec![]),
        ("transfer", vec![json!("admin"), json!("user"), json!("12.5")]),
        ("test", vec![]),
    ];
    for (method, args) in &calls {
        let receipt = host.invoke("normal_test", method, args, block_context())?;
        println!(
            "   ✓ {} -> {} ({} CU, {} writes)",
            method,
            receipt.value,
            receipt.compute_units,
            receipt.changes.entries.len() + receipt.changes.fields.len() + receipt.changes.balances.len()
        );
    }
    println!();

    // 4. Check balances
    println!("4. Checking balances...");
    let admin = balance(&host, "admin")?;
    let user = balance(&host, "user")?;
    println!("   admin: {admin}, user: {user}");
    if admin != "975" || user != "25" {
        bail!("unexpected balances after transfer: admin={admin} user={user}");
    }
    println!("   ✓ Balances match\n");

    // 5. A failing call must leave no trace
    println!("5. Calling transfer with an overdrawn account...");
    match host.invoke(
        "normal_test",
        "transfer",
        &[json!("user"), json!("admin"), json!("1000")],
        block_context(),
    ) {
        Ok(_) => bail!("overdrawn transfer was accepted"),
        Err(err) => println!("   ✓ Rejected: {err}"),
    }
    if balance(&host, "user")? != "25" {
        bail!("rejected transfer changed a balance");
    }
    println!("   ✓ Balances untouched\n");

    println!("=== All checks passed ===");
    Ok(())
}
