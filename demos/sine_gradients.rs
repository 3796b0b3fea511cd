//! Differentiates a small trigonometric expression and prints the
//! analytical gradients next to their closed forms.

use derivar::{mul, sin, Result, Variable};

fn main() -> Result<()> {
    // y = x * sin(x), dy/dx = sin(x) + x cos(x)
    let x = Variable::scalar(1.2).with_name("x");
    let y = mul(&x, sin(&x)?)?;

    y.backward(false)?;

    let analytical = x.grad().expect("gradient accumulated").sum();
    let expected = 1.2f32.sin() + 1.2 * 1.2f32.cos();

    println!("y       = {}", y.data().expect("forward ran").sum());
    println!("dy/dx   = {analytical}");
    println!("closed  = {expected}");

    Ok(())
}
