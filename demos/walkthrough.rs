//! Tour of the engine: variables, mode scopes, backward, reshape.

use derivar::{add, eval_mode, is_training, reshape, Result, Variable};

fn main() -> Result<()> {
    let x = Variable::scalar(1.0).with_name("x");
    println!("{x}");

    x.set_data(ndarray::arr1(&[1.0, 2.0, 3.0]).into_dyn());
    println!("after set_data: {x}");

    println!("train: {}", is_training());
    {
        let _guard = eval_mode();
        println!("train (inside eval scope): {}", is_training());
    }
    println!("train (after scope): {}", is_training());

    let a = Variable::scalar(1.0);
    let b = Variable::scalar(2.0);
    let sum = add(&a, &b)?;
    println!("a + b = {sum}");

    sum.backward(false)?;
    println!("da = {:?}", a.grad());

    let m = Variable::from_shape_vec(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
    let t = reshape(&m, &[3, 2])?;
    println!("m = {m}");
    println!("m reshaped to 3x2 = {t}");

    Ok(())
}
