use serde_json::{json, Value};

use crate::ast::Expr;
use crate::context::EvalContext;
use crate::error::ExpressionError;
use crate::value::{
  eval_binary, eval_free_call, eval_index, eval_member, eval_method_call, eval_unary_neg,
  eval_unary_not, EValue,
};

pub fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> Result<EValue, ExpressionError> {
  Ok(eval_raw(expr, ctx)?.collapse())
}

/// Evaluates without forcing the top-level collapse, so `Index`'s base
/// argument can see a raw `ItemList`/`NodeRef` and index into it rather than
/// its collapsed first element.
fn eval_raw(expr: &Expr, ctx: &EvalContext<'_>) -> Result<EValue, ExpressionError> {
  match expr {
    Expr::Null => Ok(EValue::Json(Value::Null)),
    Expr::Bool(b) => Ok(EValue::Json(Value::Bool(*b))),
    Expr::Number(n) => Ok(EValue::Json(json!(n))),
    Expr::Str(s) => Ok(EValue::Json(json!(s))),
    Expr::Var(name) => Ok(resolve_var(name, ctx)),
    Expr::Member(base, field) => {
      let base_val = eval_raw(base, ctx)?;
      Ok(eval_member(base_val, field))
    }
    Expr::Index(base, index) => {
      // `$node["Name"]` is resolved by name directly against node_states,
      // rather than through a generic root-variable value.
      if let Expr::Var(name) = base.as_ref() {
        if name == "node" {
          let key = eval(index, ctx)?.to_display_string();
          return Ok(match ctx.node_states.get(&key) {
            Some(items) => EValue::NodeRef(items.iter().map(|d| d.json.clone()).collect()),
            None => EValue::Undefined,
          });
        }
      }
      let base_val = eval_raw(base, ctx)?;
      let index_val = eval(index, ctx)?;
      Ok(eval_index(base_val, index_val))
    }
    Expr::MethodCall(receiver, method, args) => {
      let receiver_val = eval_raw(receiver, ctx)?;
      let arg_vals = args
        .iter()
        .map(|a| eval(a, ctx))
        .collect::<Result<Vec<_>, _>>()?;
      eval_method_call(receiver_val, method, arg_vals)
    }
    Expr::FreeCall(name, args) => {
      let arg_vals = args
        .iter()
        .map(|a| eval(a, ctx))
        .collect::<Result<Vec<_>, _>>()?;
      eval_free_call(name, arg_vals)
    }
    Expr::Unary(op, inner) => {
      let v = eval(inner, ctx)?;
      Ok(match op {
        crate::ast::UnOp::Not => eval_unary_not(v),
        crate::ast::UnOp::Neg => eval_unary_neg(v),
      })
    }
    Expr::Binary(op, lhs, rhs) => {
      let l = eval(lhs, ctx)?;
      let r = eval(rhs, ctx)?;
      eval_binary(*op, l, r)
    }
  }
}

fn resolve_var(name: &str, ctx: &EvalContext<'_>) -> EValue {
  match name {
    "json" => ctx
      .current_json()
      .cloned()
      .map(EValue::Json)
      .unwrap_or(EValue::Undefined),
    "input" => EValue::ItemList(ctx.input_items.iter().map(|d| d.json.clone()).collect()),
    "node" => EValue::Undefined, // only meaningful indexed, see Expr::Index above
    "env" => {
      let map = ctx
        .env
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect::<serde_json::Map<_, _>>();
      EValue::Json(Value::Object(map))
    }
    "execution" => EValue::Json(json!({
      "id": ctx.execution_id,
      "mode": match ctx.mode {
        flowcraft_model::ExecutionMode::Manual => "manual",
        flowcraft_model::ExecutionMode::Webhook => "webhook",
        flowcraft_model::ExecutionMode::Cron => "cron",
      },
      "startTime": ctx.start_time.to_rfc3339(),
    })),
    "runIndex" => EValue::Json(json!(ctx.run_index)),
    "itemIndex" => EValue::Json(json!(ctx.item_index)),
    _ => EValue::Undefined,
  }
}
