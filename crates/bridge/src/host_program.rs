// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The generated prelude and suffix wrapped around every program host body
//! (spec.md §4.6 "Bootstrap"): installs a mutable `mill` global whose
//! methods round-trip a request over the sentinel-framed protocol and
//! resolve once a matching `{kind:"response", requestId}` arrives on stdin,
//! then runs the user program body as the sole async function body and
//! reports its settlement as the terminal `result` message.

/// Installs `globalThis.mill` and opens the async function the program body
/// runs inside. [`SUFFIX`] closes it.
pub const PRELUDE: &str = r#"
const __MILL_SENTINEL__ = "__MILL_HOST__";
let __MILL_NEXT_REQUEST_ID__ = 0;
const __MILL_PENDING__ = new Map();

function __millSend(message) {
  process.stdout.write(__MILL_SENTINEL__ + JSON.stringify(message) + "\n");
}

function __millRequest(requestType, fields) {
  const requestId = String(++__MILL_NEXT_REQUEST_ID__);
  return new Promise((resolve, reject) => {
    __MILL_PENDING__.set(requestId, { resolve, reject });
    __millSend({ kind: "request", requestId, requestType, ...fields });
  });
}

(function __millListenForResponses() {
  const readline = require("readline");
  const rl = readline.createInterface({ input: process.stdin, terminal: false });
  rl.on("line", (line) => {
    let message;
    try {
      message = JSON.parse(line);
    } catch {
      return;
    }
    if (message.kind !== "response") return;
    const pending = __MILL_PENDING__.get(message.requestId);
    if (!pending) return;
    __MILL_PENDING__.delete(message.requestId);
    if (message.ok) pending.resolve(message.value);
    else pending.reject(new Error(message.message));
  });
})();

globalThis.mill = {
  spawn: (input) => __millRequest("spawn", { input }),
  extensions: new Proxy(
    {},
    {
      get(_target, extensionName) {
        return new Proxy(
          {},
          {
            get(_t, methodName) {
              return (...args) =>
                __millRequest("extension", { extensionName, methodName, args });
            },
          }
        );
      },
    }
  ),
};

async function __millRun() {
"#;

/// Closes the async function body [`PRELUDE`] opened, runs it, and reports
/// its settlement as the terminal `{kind:"result"}` message.
pub const SUFFIX: &str = r#"
}

__millRun().then(
  (value) => {
    __millSend({ kind: "result", ok: true, value: value === undefined ? null : value });
    process.exit(0);
  },
  (err) => {
    __millSend({ kind: "result", ok: false, message: err && err.message ? err.message : String(err) });
    process.exit(1);
  }
);
"#;
