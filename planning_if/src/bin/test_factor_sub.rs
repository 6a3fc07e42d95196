//! Simple planning factor subscriber test
//!
//! Connects to a factor publisher and prints a summary of every batch it
//! receives.

use structopt::StructOpt;

use planning_if::{
    factor::{PlanningFactorArray, FACTOR_TOPIC_PREFIX},
    net::{split_topic_message, MonitoredSocket, SocketOptions},
};

/// Command line options for the test subscriber
#[derive(Debug, StructOpt)]
#[structopt(name = "test_factor_sub")]
struct Opts {
    /// Endpoint to connect the subscriber to
    #[structopt(long, default_value = "tcp://localhost:5040")]
    endpoint: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::from_args();

    // Create context
    let ctx = zmq::Context::new();

    // Create socket options, the defaults block until the publisher is up
    let socket_options = SocketOptions {
        ..Default::default()
    };

    // Create socket
    let socket = MonitoredSocket::new(&ctx, zmq::SUB, socket_options, &opts.endpoint)?;

    // Subscribe to every planning factor topic
    socket.set_subscribe(FACTOR_TOPIC_PREFIX.as_bytes())?;

    // Receive batches from the publisher
    loop {
        let msg = socket.recv_msg(0)?;

        let msg_str = match msg.as_str() {
            Some(s) => s,
            None => {
                println!("Got non-utf8 message");
                continue;
            }
        };

        match split_topic_message(msg_str) {
            Some((topic, payload)) => {
                match serde_json::from_str::<PlanningFactorArray>(payload) {
                    Ok(batch) => println!(
                        "[{}] {} factor(s) at {}",
                        topic,
                        batch.factors.len(),
                        batch.stamp
                    ),
                    Err(e) => println!("Could not parse batch on {}: {}", topic, e),
                }
            }
            None => println!("Got message with no payload: {:?}", msg_str),
        }
    }
}
