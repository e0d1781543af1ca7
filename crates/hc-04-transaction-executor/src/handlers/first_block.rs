use super::CustomHandler;
use crate::context::ExecContext;
use crate::domain::transaction::{Transaction, TxBody, TX_TYPE_FIRST_BLOCK};
use crate::error::{ExecError, Result, VmError};
use hc_01_system_parameters::{names, DEFAULT_PARAMETERS};
use hc_02_state_store::{install_schema, Row};
use shared_types::FirstBlockData;
use tracing::info;

/// Founder account table of the platform ecosystem.
const FOUNDER_TABLE: &str = "1_keys";

/// Bootstraps the chain: schema, default parameters, founder account.
#[derive(Debug, Default)]
pub struct FirstBlockHandler;

impl CustomHandler for FirstBlockHandler {
    fn tx_type(&self) -> u8 {
        TX_TYPE_FIRST_BLOCK
    }

    fn name(&self) -> &'static str {
        "FirstBlock"
    }

    fn play(&self, ctx: &mut ExecContext<'_>, tx: &Transaction) -> Result<String> {
        let TxBody::FirstBlock(body) = &tx.body else {
            return Err(ExecError::Malformed("expected a first block body".into()));
        };
        if ctx.block.block_id != 1 {
            return Err(VmError::InvalidParam {
                name: "block_id".into(),
                reason: format!("first block transaction in block {}", ctx.block.block_id),
            }
            .into());
        }

        install_schema(&mut *ctx.db, ctx.block.block_time)?;
        ctx.db.seed_system_parameters(DEFAULT_PARAMETERS.iter().copied());
        ctx.db.set_system_parameter(names::TEST, bool_param(body.test));
        ctx.db
            .set_system_parameter(names::PRIVATE_BLOCKCHAIN, bool_param(body.private_blockchain));

        let founder = Row::from([
            ("pub".to_string(), hex::encode(&body.header.public_key)),
            ("amount".to_string(), body.founder_amount.to_string()),
            ("deleted".to_string(), "0".to_string()),
            ("blocked".to_string(), "0".to_string()),
        ]);
        ctx.db
            .put_row(FOUNDER_TABLE, &body.header.key_id.to_string(), founder)?;

        ctx.params.set_first_block_data(FirstBlockData {
            time: body.header.time,
            key_id: body.header.key_id,
            public_key: body.header.public_key.clone(),
            node_public_key: body.node_public_key.clone(),
            test: body.test,
            private_blockchain: body.private_blockchain,
        });
        ctx.mark_sys_update();

        info!(
            founder = body.header.key_id,
            test = body.test,
            "[hc-04] 🌱 first block applied"
        );
        Ok("first block".into())
    }
}

fn bool_param(flag: bool) -> &'static str {
    if flag {
        "true"
    } else {
        "false"
    }
}
