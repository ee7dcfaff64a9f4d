//! Client integration tests for tessera-sdk
//!
//! Tests bootstrap, the query envelopes and the three submission tiers
//! against a mock node.

use base64::prelude::*;
use serde_json::{json, Value};
use tessera_sdk::transport::{query_envelope, MOCK_CHAIN_ID};
use tessera_sdk::{
    Address, ErrorKind, KdfParams, MockTransport, SdkError, TesseraClient, TxBuilder, Wallet, U256,
};

const FAST: KdfParams = KdfParams { n: 1024, r: 8, p: 1 };

async fn client() -> (TesseraClient, MockTransport) {
    let transport = MockTransport::new();
    let client = TesseraClient::with_transport(transport.clone()).await.unwrap();
    transport.clear_requests();
    (client, transport)
}

fn addr(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

// ==================== Bootstrap Tests ====================

#[tokio::test]
async fn test_bootstrap_learns_chain_id() {
    let (client, _) = client().await;
    assert_eq!(client.chain_id(), MOCK_CHAIN_ID);
}

#[tokio::test]
async fn test_bootstrap_fails_without_genesis() {
    let transport = MockTransport::new();
    transport.set_transport_failure("genesis", "connection refused");
    let err = TesseraClient::with_transport(transport).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_bootstrap_rejects_empty_chain_id() {
    let transport = MockTransport::new();
    transport.set_result("genesis", json!({"genesis": {"chain_id": ""}}));
    let err = TesseraClient::with_transport(transport).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

// ==================== Chain Info Tests ====================

#[tokio::test]
async fn test_status() {
    let (client, transport) = client().await;
    transport.set_result(
        "status",
        json!({
            "node_info": {"id": "abc", "network": MOCK_CHAIN_ID, "moniker": "n0"},
            "sync_info": {"latest_block_height": "1234", "catching_up": false},
            "validator_info": {"address": "AABB", "voting_power": "10"}
        }),
    );

    let status = client.status().await.unwrap();
    assert_eq!(status.node_info.network, MOCK_CHAIN_ID);
    assert_eq!(status.sync_info.latest_block_height, 1234);
    assert_eq!(status.validator_info.voting_power, 10);
}

#[tokio::test]
async fn test_gov_params() {
    let (client, transport) = client().await;
    transport.set_query_value(
        "gov_params",
        json!({"version": "1", "maxValidatorCnt": 21, "minValidatorStake": "0x3e8"}),
    );

    let params = client.gov_params().await.unwrap();
    assert_eq!(params.get_i64("maxValidatorCnt"), Some(21));
    assert_eq!(params.get_u256("minValidatorStake"), Some(U256::from(1000u64)));
    assert_eq!(transport.requests_for("gov_params")[0].params, vec![json!("0")]);
}

#[tokio::test]
async fn test_validators_page_zero_becomes_one() {
    let (client, transport) = client().await;
    transport.set_result(
        "validators",
        json!({"block_height": "10", "validators": [], "count": "0", "total": "0"}),
    );

    client.validators(0, 0, 30).await.unwrap();
    client.validators(7, 2, 30).await.unwrap();

    let reqs = transport.requests_for("validators");
    assert_eq!(reqs[0].params, vec![json!("0"), json!("1"), json!("30")]);
    assert_eq!(reqs[1].params, vec![json!("7"), json!("2"), json!("30")]);
}

// ==================== Account Query Tests ====================

#[tokio::test]
async fn test_account_decimal_and_hex_balance() {
    let (client, transport) = client().await;

    for balance in ["1000", "0x3e8"] {
        transport.set_query_value(
            "account",
            json!({"address": addr(1).to_wire_string(), "nonce": "3", "balance": balance}),
        );
        let account = client.account(&addr(1)).await.unwrap();
        assert_eq!(account.balance, U256::from(1000u64), "balance {}", balance);
        assert_eq!(account.nonce, 3);
    }

    let params = &transport.requests_for("account")[0].params;
    assert_eq!(params, &vec![json!(addr(1).to_wire_string()), json!("0")]);
}

#[tokio::test]
async fn test_account_bad_balance_is_decode_error() {
    let (client, transport) = client().await;
    transport.set_query_value(
        "account",
        json!({"address": addr(1).to_wire_string(), "nonce": "0", "balance": "lots"}),
    );
    let err = client.account(&addr(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_account_missing_balance_is_decode_error() {
    let (client, transport) = client().await;
    transport.set_query_value(
        "account",
        json!({"address": addr(1).to_wire_string(), "nonce": "3"}),
    );
    let err = client.account(&addr(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_query_nonzero_code_is_application_error() {
    let (client, transport) = client().await;
    transport.set_query_failure("account", 31, "account not found");

    match client.account(&addr(1)).await.unwrap_err() {
        SdkError::Application { code, log } => {
            assert_eq!(code, 31);
            assert_eq!(log, "account not found");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_rpc_error_is_protocol_error() {
    let (client, transport) = client().await;
    transport.set_error("account", json!({"code": -32603, "message": "internal"}));
    let err = client.account(&addr(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(err.to_string().contains("internal"));
}

#[tokio::test]
async fn test_unknown_method_is_protocol_error() {
    let (client, _) = client().await;
    let err = client.delegatee(&addr(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[tokio::test]
async fn test_delegatee() {
    let (client, transport) = client().await;
    transport.set_query_value(
        "delegatee",
        json!({
            "address": addr(2).to_wire_string(),
            "pubKey": "02AB",
            "selfPower": "100",
            "totalPower": "250",
            "slashedPower": "0",
            "delegators": [addr(3).to_wire_string()],
            "notSingedBlockCount": "4"
        }),
    );

    let d = client.delegatee(&addr(2)).await.unwrap();
    assert_eq!(d.total_power, 250);
    assert_eq!(d.delegators, vec![addr(3)]);
    assert_eq!(d.not_signed_block_count, 4);
}

#[tokio::test]
async fn test_stakes() {
    let (client, transport) = client().await;
    transport.set_query_value("stakes", Value::Null);
    assert!(client.stakes(&addr(1)).await.unwrap().is_empty());

    transport.set_query_value(
        "stakes",
        json!([{
            "owner": addr(1).to_wire_string(),
            "to": addr(2).to_wire_string(),
            "txhash": "ABCD",
            "startHeight": "5",
            "power": "100"
        }]),
    );
    let stakes = client.stakes(&addr(1)).await.unwrap();
    assert_eq!(stakes.len(), 1);
    assert_eq!(stakes[0].to, addr(2));
    assert_eq!(stakes[0].txhash.as_slice(), &[0xAB, 0xCD]);
    assert_eq!(stakes[0].power, 100);
}

#[tokio::test]
async fn test_reward() {
    let (client, transport) = client().await;
    transport.set_query_value(
        "reward",
        json!({
            "address": addr(1).to_wire_string(),
            "issued": "1000",
            "withdrawn": "0x64",
            "slashed": "0",
            "cumulated": "900",
            "height": "77"
        }),
    );

    let reward = client.reward(&addr(1), 77).await.unwrap();
    assert_eq!(reward.withdrawn, U256::from(100u64));
    assert_eq!(reward.cumulated, U256::from(900u64));
    assert_eq!(
        transport.requests_for("reward")[0].params,
        vec![json!(addr(1).to_wire_string()), json!("77")]
    );
}

#[tokio::test]
async fn test_power_queries_accept_number_or_string() {
    let (client, transport) = client().await;
    transport.set_query_value("stakes/total_power", json!(5000));
    transport.set_query_value("stakes/voting_power", json!("4200"));

    assert_eq!(client.total_power(0).await.unwrap(), 5000);
    assert_eq!(client.voting_power(0).await.unwrap(), 4200);
}

#[tokio::test]
async fn test_power_queries_reject_missing_value() {
    let (client, transport) = client().await;
    transport.set_query_value("stakes/total_power", Value::Null);
    transport.set_query_value("stakes/voting_power", json!(""));

    let err = client.total_power(0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    let err = client.voting_power(0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    transport.set_query_value("stakes/voting_power", json!("0"));
    assert_eq!(client.voting_power(0).await.unwrap(), 0);
}

#[tokio::test]
async fn test_proposal_hash_is_base64() {
    let (client, transport) = client().await;
    transport.set_query_value("proposal", json!({"status": "voting", "proposal": {"message": "m"}}));

    let result = client.proposal(&[0xAA; 32], 0).await.unwrap();
    assert_eq!(result.status, "voting");

    let params = &transport.requests_for("proposal")[0].params;
    assert_eq!(params[0], json!(BASE64_STANDARD.encode([0xAA; 32])));
    assert_eq!(params[1], json!("0"));
}

// ==================== Contract Query Tests ====================

#[tokio::test]
async fn test_vm_call() {
    let (client, transport) = client().await;
    transport.set_query_value(
        "vm_call",
        json!({"usedGas": "21000", "returnData": BASE64_STANDARD.encode([0u8; 32])}),
    );

    let result = client.vm_call(&addr(1), &addr(2), 0, &[0x12, 0x34]).await.unwrap();
    assert_eq!(result.used_gas, 21000);
    assert_eq!(result.return_data, vec![0u8; 32]);

    let params = &transport.requests_for("vm_call")[0].params;
    assert_eq!(
        params,
        &vec![
            json!(addr(1).to_wire_string()),
            json!(addr(2).to_wire_string()),
            json!("0"),
            json!(BASE64_STANDARD.encode([0x12, 0x34])),
        ]
    );
}

#[tokio::test]
async fn test_vm_estimate_gas_failure() {
    let (client, transport) = client().await;
    transport.set_query_failure("vm_estimate_gas", 6, "execution reverted");
    let err = client
        .vm_estimate_gas(&addr(1), &addr(2), 0, &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Application);
}

// ==================== Submission Tests ====================

fn signed_transfer(client: &TesseraClient) -> (Wallet, tessera_sdk::Transaction) {
    let wallet = Wallet::new_with_params(b"pw", FAST).unwrap();
    let mut tx = TxBuilder::new(wallet.address())
        .to(addr(9))
        .gas(100_000)
        .gas_price(10u64)
        .transfer(U256::from(5u64));
    wallet.sign_tx(&mut tx, client.chain_id()).unwrap();
    (wallet, tx)
}

#[tokio::test]
async fn test_send_async_carries_encoded_tx() {
    let (client, transport) = client().await;
    transport.set_result(
        "broadcast_tx_async",
        json!({"code": 0, "data": "", "log": "", "codespace": "", "hash": "AABBCC"}),
    );
    let (_, tx) = signed_transfer(&client);

    let result = client.send_tx_async(&tx).await.unwrap();
    assert!(result.is_ok());
    assert_eq!(result.hash.as_slice(), &[0xAA, 0xBB, 0xCC]);

    let params = &transport.requests_for("broadcast_tx_async")[0].params;
    assert_eq!(params, &vec![json!(BASE64_STANDARD.encode(tx.encode()))]);
}

#[tokio::test]
async fn test_send_sync_reports_admission_code() {
    let (client, transport) = client().await;
    transport.set_result(
        "broadcast_tx_sync",
        json!({"code": 12, "log": "insufficient fund", "hash": "AA"}),
    );
    let (_, tx) = signed_transfer(&client);

    let result = client.send_tx_sync(&tx).await.unwrap();
    assert!(!result.is_ok());
    assert_eq!(result.log, "insufficient fund");
}

#[tokio::test]
async fn test_commit_check_failure_leaves_deliver_empty() {
    let (client, transport) = client().await;
    transport.set_result(
        "broadcast_tx_commit",
        json!({
            "check_tx": {"code": 3, "log": "invalid nonce"},
            "deliver_tx": {},
            "hash": "AA",
            "height": "0"
        }),
    );
    let (_, tx) = signed_transfer(&client);

    let result = client.send_tx_commit(&tx).await.unwrap();
    assert!(!result.is_ok());
    assert_eq!(result.check_tx.code, 3);
    assert!(result.deliver_tx.data.is_empty());
    assert!(result.deliver_tx.log.is_empty());
}

#[tokio::test]
async fn test_commit_deliver_failure_is_not_ok() {
    let (client, transport) = client().await;
    transport.set_result(
        "broadcast_tx_commit",
        json!({
            "check_tx": {"code": 0},
            "deliver_tx": {"code": 5, "log": "out of gas", "gas_used": "100000"},
            "hash": "AA",
            "height": "12"
        }),
    );
    let (_, tx) = signed_transfer(&client);

    let result = client.send_tx_commit(&tx).await.unwrap();
    assert!(result.check_tx.is_ok());
    assert!(!result.is_ok());
    assert_eq!(result.height, 12);
    assert_eq!(result.deliver_tx.gas_used, 100_000);
}

#[tokio::test]
async fn test_unsigned_tx_is_rejected_before_sending() {
    let (client, transport) = client().await;
    let tx = TxBuilder::new(addr(1)).to(addr(2)).transfer(U256::one());

    let err = client.send_tx_sync(&tx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_tx_query_decodes_transaction() {
    let (client, transport) = client().await;
    let (_, tx) = signed_transfer(&client);
    transport.set_result(
        "tx",
        json!({
            "hash": hex::encode_upper(tx.hash().as_bytes()),
            "height": "42",
            "index": 0,
            "tx_result": {"code": 0},
            "tx": BASE64_STANDARD.encode(tx.encode())
        }),
    );

    let result = client.tx(tx.hash().as_bytes()).await.unwrap();
    assert_eq!(result.transaction, tx);
    assert_eq!(result.raw.height, 42);

    let params = &transport.requests_for("tx")[0].params;
    assert_eq!(params[0], json!(BASE64_STANDARD.encode(tx.hash().as_bytes())));
    assert_eq!(params[1], json!(false));
}

#[tokio::test]
async fn test_query_envelope_shape() {
    let envelope = query_envelope(0, "", &json!({"a": 1}));
    assert_eq!(envelope["code"], json!(0));
    assert_eq!(envelope["value"], json!({"a": 1}));
}
