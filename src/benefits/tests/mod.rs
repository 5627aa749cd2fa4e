mod common;
mod period;
mod routing;
