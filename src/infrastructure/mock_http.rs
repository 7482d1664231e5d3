// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Drives a `wiremock` server from synchronous tests.
//!
//! The adapters use blocking HTTP clients, which must not run inside an
//! async context. The server lives on its own runtime and the test thread
//! only enters that runtime to start the server and mount mocks.

use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer};

pub struct MockHttp {
    // Declared before `rt` so the server shuts down while its runtime is alive.
    server: MockServer,
    rt: Runtime,
}

impl MockHttp {
    pub fn start() -> Self {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        Self { server, rt }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    /// Bodies of every request received so far, parsed as JSON.
    pub fn json_bodies(&self) -> Vec<serde_json::Value> {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}
